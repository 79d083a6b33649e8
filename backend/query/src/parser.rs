//! Parser for compiled query strings.
//!
//! The inverse of [`compile`](crate::compile): useful for replaying queries
//! captured in logs. Parsed queries go through the same validation as built
//! ones.

use treeprobe_core::{decode_literal, ProbeError, ProbeResult};

use crate::query::Query;
use crate::segment::{Filters, Segment};

pub fn parse_query(text: &str) -> ProbeResult<Query> {
    if text == "/" {
        return Ok(Query::pseudo_tree_root());
    }
    if !text.starts_with('/') {
        return Err(ProbeError::invalid_query(format!(
            "query '{text}' must start with '/'"
        )));
    }

    let mut rest = text;
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let relative = if let Some(after) = rest.strip_prefix("//") {
            rest = after;
            true
        } else if let Some(after) = rest.strip_prefix('/') {
            rest = after;
            false
        } else {
            return Err(ProbeError::invalid_query(format!(
                "expected a separator at '{rest}' in '{text}'"
            )));
        };

        let name_end = rest.find(['/', '[']).unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = &rest[name_end..];

        let predicates = if rest.starts_with('[') {
            let (filters, after) = parse_predicate_list(rest, text)?;
            rest = after;
            filters
        } else {
            Filters::new()
        };

        segments.push(Segment {
            name: name.to_string(),
            relative,
            predicates,
        });
    }
    Query::from_segments(segments)
}

/// Parse `[k=v,...]` at the start of `input`, returning the filters and the
/// remaining text.
fn parse_predicate_list<'a>(input: &'a str, text: &str) -> ProbeResult<(Filters, &'a str)> {
    let mut rest = &input[1..];
    let mut filters = Filters::new();
    loop {
        let eq = rest.find('=').ok_or_else(|| {
            ProbeError::invalid_query(format!("predicate without '=' in '{text}'"))
        })?;
        let key = &rest[..eq];
        if key.is_empty() {
            return Err(ProbeError::invalid_query(format!("empty predicate key in '{text}'")));
        }
        rest = &rest[eq + 1..];

        let literal_end = literal_len(rest).ok_or_else(|| {
            ProbeError::invalid_query(format!("unterminated predicate list in '{text}'"))
        })?;
        let literal = decode_literal(&rest[..literal_end])
            .map_err(|e| ProbeError::invalid_query(format!("bad literal for '{key}': {e}")))?;
        if filters.get(key).is_some() {
            return Err(ProbeError::invalid_query(format!(
                "duplicate predicate key '{key}' in '{text}'"
            )));
        }
        filters.insert(key, literal);
        rest = &rest[literal_end..];

        match rest.as_bytes().first() {
            Some(b',') => rest = &rest[1..],
            Some(b']') => return Ok((filters, &rest[1..])),
            _ => {
                return Err(ProbeError::invalid_query(format!(
                    "unterminated predicate list in '{text}'"
                )))
            }
        }
    }
}

/// Byte length of the literal at the start of `input`.
fn literal_len(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'"') {
        return input.find([',', ']']);
    }
    let mut escaped = false;
    for (i, byte) in bytes.iter().enumerate().skip(1) {
        match byte {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i + 1),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use treeprobe_core::Literal;

    #[test]
    fn parses_what_the_compiler_produces() {
        let samples = [
            "/",
            "/Unity",
            "//foo",
            "/foo/bar",
            "/App/..",
            "/App/*",
            r#"//*[key="value"]"#,
            r#"/App//Button[visible=True,objectName="a,b]\"c",width=-20]/Label"#,
            r#"/App[name="\x41\n"]"#,
        ];
        for sample in samples {
            let query = parse_query(sample).unwrap();
            let reparsed = parse_query(query.server_query()).unwrap();
            assert_eq!(reparsed, query, "{sample}");
        }
    }

    #[test]
    fn decodes_predicate_literals() {
        let query = parse_query(r#"/App/Button[enabled=False,id=+7,label="\x41"]"#).unwrap();
        let filters = &query.segments()[1].predicates;
        assert_eq!(filters.get("enabled"), Some(&Literal::Bool(false)));
        assert_eq!(filters.get("id"), Some(&Literal::Int(7)));
        assert_eq!(filters.get("label"), Some(&Literal::from("A")));
        assert_eq!(query.server_query(), r#"/App/Button[enabled=False,id=7,label="A"]"#);
    }

    #[test]
    fn rejects_malformed_queries() {
        for bad in [
            "",
            "App",
            "//*",
            "/App[",
            "/App[x]",
            "/App[x=1",
            "/App[=1]",
            "/App[x=1,x=2]",
            r#"/App[x="open]"#,
            "/App[x=2147483648]",
            "/App[x=1]junk",
        ] {
            assert!(parse_query(bad).is_err(), "accepted {bad:?}");
        }
    }
}
