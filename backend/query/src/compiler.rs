//! Query compiler: segments in, canonical query string out.
//!
//! ```text
//! query          := "/" | segment+
//! segment        := ("/" | "//") name predicate_list?
//! name           := identifier | "*" | ".."
//! predicate_list := "[" key "=" literal ("," key "=" literal)* "]"
//! ```
//!
//! Every rule violation is an `InvalidQuery` error raised locally; nothing
//! invalid ever reaches the transport.

use once_cell::sync::Lazy;
use regex::Regex;
use treeprobe_core::{encode_literal, Literal, ProbeError, ProbeResult};

use crate::segment::Segment;

/// Keys the remote parser accepts inside a predicate list.
static SERVER_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-]+( [a-zA-Z0-9_\-])*$").unwrap());

/// Characters that would break the query grammar if used in a type name.
const RESERVED_NAME_CHARS: &[char] = &['/', '[', ']', ',', '=', '"'];

/// True when `key=value` can be expressed in the query string.
pub fn is_server_side_predicate(key: &str, value: &Literal) -> bool {
    SERVER_KEY_PATTERN.is_match(key) && value.is_wire_representable()
}

/// Compile a sequence of segments into the query string sent to `GetState`.
pub fn compile(segments: &[Segment]) -> ProbeResult<String> {
    let Some(first) = segments.first() else {
        return Err(ProbeError::invalid_query("a query needs at least one segment"));
    };

    if first.is_tree_root() {
        if first.relative || !first.predicates.is_empty() {
            return Err(ProbeError::invalid_query(
                "the tree root segment takes no separator or predicates",
            ));
        }
        if segments.len() > 1 {
            return Err(ProbeError::invalid_query(
                "cannot select children from a pseudo-tree-root query",
            ));
        }
        return Ok("/".to_string());
    }

    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        validate_segment(index, segment)?;
        out.push_str(if segment.relative { "//" } else { "/" });
        out.push_str(&segment.name);
        if !segment.predicates.is_empty() {
            out.push_str(&compile_predicates(segment)?);
        }
    }
    Ok(out)
}

fn validate_segment(index: usize, segment: &Segment) -> ProbeResult<()> {
    if segment.is_tree_root() {
        return Err(ProbeError::invalid_query(format!(
            "segment {index} has an empty name; only the first segment may denote the root"
        )));
    }
    if segment.is_parent() {
        if index == 0 {
            return Err(ProbeError::invalid_query("a query cannot start by selecting a parent"));
        }
        if segment.relative {
            return Err(ProbeError::invalid_query(
                "a parent may only be selected with the child separator '/'",
            ));
        }
        if !segment.predicates.is_empty() {
            return Err(ProbeError::invalid_query(
                "cannot specify predicates while selecting a parent",
            ));
        }
        return Ok(());
    }
    if segment.is_wildcard() {
        if segment.relative && segment.predicates.is_empty() {
            return Err(ProbeError::invalid_query(
                "a wildcard after '//' must carry at least one server-side predicate",
            ));
        }
        return Ok(());
    }
    validate_type_name(&segment.name)
}

/// Type names must be non-empty printable ASCII free of grammar characters.
fn validate_type_name(name: &str) -> ProbeResult<()> {
    if !name.is_ascii() {
        return Err(ProbeError::invalid_query(format!(
            "type name '{name}' must be ASCII encodable"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| c.is_ascii_whitespace() || c.is_ascii_control() || RESERVED_NAME_CHARS.contains(c))
    {
        return Err(ProbeError::invalid_query(format!(
            "type name '{name}' contains reserved character {bad:?}"
        )));
    }
    Ok(())
}

fn compile_predicates(segment: &Segment) -> ProbeResult<String> {
    let pairs = segment
        .predicates
        .iter()
        .map(|(key, value)| {
            if !is_server_side_predicate(key, value) {
                return Err(ProbeError::invalid_query(format!(
                    "predicate '{key}' on '{}' has no wire representation; \
                     it must be filtered on the client",
                    segment.name
                )));
            }
            Ok(format!("{key}={}", encode_literal(value)?))
        })
        .collect::<ProbeResult<Vec<_>>>()?;
    Ok(format!("[{}]", pairs.join(",")))
}
