//! Predicate literals and their query-string encoding.
//!
//! Literals appear on the right-hand side of `key=value` predicates. Only
//! booleans, 32-bit integers and strings have a textual form on the wire;
//! anything else must be compared on the client after the results arrive.

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, ProbeResult};
use crate::value::{PlainValue, WireValue};

/// The right-hand side of an equality predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Text(String),
    /// Compound values are compared structurally on the client side.
    Value(WireValue),
}

impl Literal {
    /// Whether this literal can be serialized into the query string.
    /// Only ASCII strings are sent; others are matched client-side.
    pub fn is_wire_representable(&self) -> bool {
        match self {
            Self::Bool(_) => true,
            Self::Text(s) => s.is_ascii(),
            Self::Int(i) => i32::try_from(*i).is_ok(),
            Self::Value(_) => false,
        }
    }

    /// Deep structural equality against a decoded attribute value.
    pub fn matches(&self, value: &WireValue) -> bool {
        match (self, value) {
            (Self::Bool(expected), WireValue::Plain(PlainValue::Bool(actual))) => {
                expected == actual
            }
            (Self::Int(expected), WireValue::Plain(PlainValue::Int(actual))) => {
                *expected == i64::from(*actual)
            }
            (Self::Text(expected), WireValue::Plain(PlainValue::Text(actual))) => {
                expected == actual
            }
            (Self::Value(expected), actual) => expected == actual,
            _ => false,
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<WireValue> for Literal {
    fn from(value: WireValue) -> Self {
        Self::Value(value)
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Render a literal as query-string text.
pub fn encode_literal(literal: &Literal) -> ProbeResult<String> {
    match literal {
        Literal::Bool(true) => Ok("True".to_string()),
        Literal::Bool(false) => Ok("False".to_string()),
        Literal::Int(i) => {
            let narrow = i32::try_from(*i).map_err(|_| {
                ProbeError::invalid_query(format!(
                    "integer {i} has no wire representation outside the signed 32-bit range"
                ))
            })?;
            Ok(narrow.to_string())
        }
        Literal::Text(s) => Ok(encode_string_literal(s)),
        Literal::Value(v) => Err(ProbeError::invalid_query(format!(
            "{:?} values have no wire representation",
            v.value_type()
        ))),
    }
}

/// Quote and escape a string. Printable ASCII passes through; everything
/// else is written as `\xNN` escapes over its UTF-8 bytes.
pub fn encode_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for byte in value.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push('"');
    out
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse query-string literal text back into a literal.
pub fn decode_literal(text: &str) -> ProbeResult<Literal> {
    match text {
        "True" => Ok(Literal::Bool(true)),
        "False" => Ok(Literal::Bool(false)),
        _ if text.starts_with('"') => decode_string_literal(text).map(Literal::Text),
        _ => decode_int_literal(text).map(Literal::Int),
    }
}

/// Parse an optionally signed decimal integer within the signed 32-bit range.
pub fn decode_int_literal(text: &str) -> ProbeResult<i64> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProbeError::decode(format!("'{text}' is not an integer literal")));
    }
    let value: i64 = text
        .parse()
        .map_err(|_| ProbeError::decode(format!("integer literal '{text}' is out of range")))?;
    if i32::try_from(value).is_err() {
        return Err(ProbeError::decode(format!(
            "integer literal {value} outside the signed 32-bit range"
        )));
    }
    Ok(value)
}

/// Unquote and unescape a string literal, including its surrounding quotes.
pub fn decode_string_literal(text: &str) -> ProbeResult<String> {
    let inner = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|_| text.len() >= 2)
        .ok_or_else(|| ProbeError::decode(format!("unterminated string literal {text}")))?;

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes();
    while let Some(byte) = iter.next() {
        match byte {
            b'\\' => {
                let escaped = iter
                    .next()
                    .ok_or_else(|| ProbeError::decode("dangling backslash in string literal"))?;
                match escaped {
                    b'"' | b'\'' | b'\\' => bytes.push(escaped),
                    b'n' => bytes.push(b'\n'),
                    b'r' => bytes.push(b'\r'),
                    b't' => bytes.push(b'\t'),
                    b'0' => bytes.push(0),
                    b'x' => {
                        let hi = iter.next().and_then(hex_digit);
                        let lo = iter.next().and_then(hex_digit);
                        match (hi, lo) {
                            (Some(hi), Some(lo)) => bytes.push(hi << 4 | lo),
                            _ => {
                                return Err(ProbeError::decode(
                                    "\\x escape needs two hexadecimal digits",
                                ))
                            }
                        }
                    }
                    other => {
                        return Err(ProbeError::decode(format!(
                            "unknown escape sequence \\{}",
                            other as char
                        )))
                    }
                }
            }
            b'"' => return Err(ProbeError::decode("unescaped quote inside string literal")),
            _ => bytes.push(byte),
        }
    }
    String::from_utf8(bytes)
        .map_err(|e| ProbeError::decode(format!("string literal is not valid UTF-8: {e}")))
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Rectangle;

    #[test]
    fn booleans_are_capitalized_tokens() {
        assert_eq!(encode_literal(&Literal::Bool(true)).unwrap(), "True");
        assert_eq!(encode_literal(&Literal::Bool(false)).unwrap(), "False");
        assert_eq!(decode_literal("True").unwrap(), Literal::Bool(true));
        assert!(decode_literal("true").is_err());
        assert!(decode_literal("1").unwrap() != Literal::Bool(true));
    }

    #[test]
    fn integers_accept_explicit_sign() {
        assert_eq!(decode_literal("+17").unwrap(), Literal::Int(17));
        assert_eq!(decode_literal("-17").unwrap(), Literal::Int(-17));
        assert_eq!(decode_literal("2147483647").unwrap(), Literal::Int(2147483647));
        assert_eq!(decode_literal("-2147483648").unwrap(), Literal::Int(-2147483648));
    }

    #[test]
    fn integers_reject_out_of_range_magnitudes() {
        assert!(decode_literal("2147483648").is_err());
        assert!(decode_literal("-2147483649").is_err());
        assert!(decode_literal("99999999999999999999999").is_err());
        assert!(decode_literal("--1").is_err());
        assert!(decode_literal("+").is_err());
        assert!(encode_literal(&Literal::Int(1 << 40)).is_err());
        assert!(!Literal::Int(1 << 40).is_wire_representable());
    }

    #[test]
    fn hex_escape_decodes_to_byte() {
        assert_eq!(decode_string_literal(r#""\x41""#).unwrap(), "A");
        assert_eq!(decode_string_literal(r#""a\x42c""#).unwrap(), "aBc");
    }

    #[test]
    fn strings_with_escapes_survive_a_round_trip() {
        let samples = [
            "plain",
            "with \"quotes\" and \\slashes\\",
            "tab\tnewline\nreturn\r",
            "naïve café ✓",
            "nul\0byte",
            "",
        ];
        for sample in samples {
            let encoded = encode_string_literal(sample);
            assert!(encoded.is_ascii(), "{encoded}");
            assert_eq!(decode_string_literal(&encoded).unwrap(), sample);
            assert_eq!(
                decode_literal(&encode_literal(&Literal::from(sample)).unwrap()).unwrap(),
                Literal::from(sample)
            );
        }
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert!(decode_string_literal(r#""unterminated"#).is_err());
        assert!(decode_string_literal(r#"""#).is_err());
        assert!(decode_string_literal(r#""bad \q escape""#).is_err());
        assert!(decode_string_literal(r#""short \x4""#).is_err());
        assert!(decode_string_literal(r#""\xff""#).is_err());
    }

    #[test]
    fn non_ascii_strings_are_client_side_only() {
        assert!(Literal::from("plain ascii\n").is_wire_representable());
        assert!(!Literal::from("café").is_wire_representable());

        let node_value = WireValue::from("café");
        assert!(Literal::from("café").matches(&node_value));
    }

    #[test]
    fn compound_values_are_client_side_only() {
        let literal = Literal::from(WireValue::Rectangle(Rectangle::new(0, 0, 10, 10)));
        assert!(!literal.is_wire_representable());
        assert!(encode_literal(&literal).is_err());
        assert!(literal.matches(&WireValue::Rectangle(Rectangle::new(0, 0, 10, 10))));
        assert!(!literal.matches(&WireValue::Rectangle(Rectangle::new(0, 0, 10, 11))));
    }

    #[test]
    fn scalar_literals_match_plain_values() {
        assert!(Literal::from(5).matches(&WireValue::from(5)));
        assert!(Literal::from("x").matches(&WireValue::from("x")));
        assert!(!Literal::from("5").matches(&WireValue::from(5)));
        assert!(!Literal::from(true).matches(&WireValue::from(1)));
    }
}
