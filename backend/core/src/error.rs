use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for TreeProbe introspection.
///
/// Every failure kind a caller may want to branch on has its own variant;
/// nothing is collapsed into a generic failure.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Local grammar violation. Never reaches the transport.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("wire protocol mismatch: remote is {actual}, expecting {expected}")]
    ProtocolVersionMismatch { expected: String, actual: String },

    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("cannot decode value{}: {message}", attribute_suffix(.attribute))]
    ValueDecode {
        attribute: Option<String>,
        message: String,
    },

    #[error("malformed node at '{path}': {reason}")]
    MalformedNode { path: String, reason: String },

    #[error("state not found for query {query}: {reason}")]
    StateNotFound { query: String, reason: NotFoundReason },

    #[error("ambiguous proxy for '{path}': matched {}", .candidates.join(", "))]
    AmbiguousProxy { path: String, candidates: Vec<String> },

    #[error("proxy class '{0}' is already registered")]
    DuplicateProxyClass(String),

    #[error("timed out after {:.1}s waiting for {what}", .timeout.as_secs_f64())]
    WaitTimeout { what: String, timeout: Duration },
}

fn attribute_suffix(attribute: &Option<String>) -> String {
    match attribute {
        Some(name) => format!(" for attribute '{name}'"),
        None => String::new(),
    }
}

/// Why a single-result selection failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The query returned nothing.
    NoMatch,
    /// The query returned more than one node.
    Ambiguous(usize),
    /// Polling gave up without seeing a match.
    TimedOut(Duration),
    /// Polling gave up without reaching the requested result count.
    TooFew { wanted: usize, found: usize },
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => write!(f, "no object matched"),
            Self::Ambiguous(count) => {
                write!(f, "{count} objects matched where exactly one was required")
            }
            Self::TimedOut(timeout) => write!(
                f,
                "no object matched within {:.1}s",
                timeout.as_secs_f64()
            ),
            Self::TooFew { wanted, found } => {
                write!(f, "found {found} objects, wanted at least {wanted}")
            }
        }
    }
}

impl ProbeError {
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery(reason.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::ValueDecode {
            attribute: None,
            message: message.into(),
        }
    }

    pub fn not_found(query: impl Into<String>, reason: NotFoundReason) -> Self {
        Self::StateNotFound {
            query: query.into(),
            reason,
        }
    }

    /// Attach the attribute name to a decode error raised below the
    /// materializer, which is the only place that knows it.
    pub fn for_attribute(self, name: &str) -> Self {
        match self {
            Self::ValueDecode { message, .. } => Self::ValueDecode {
                attribute: Some(name.to_string()),
                message,
            },
            other => other,
        }
    }

    /// True for the "zero results" failure that polling may swallow.
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            Self::StateNotFound {
                reason: NotFoundReason::NoMatch,
                ..
            }
        )
    }

    /// True when a single-result selection saw more than one node.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            Self::StateNotFound {
                reason: NotFoundReason::Ambiguous(_),
                ..
            }
        )
    }
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_mismatch_names_both_versions() {
        let err = ProbeError::ProtocolVersionMismatch {
            expected: "1.4".into(),
            actual: "1.3".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1.4") && msg.contains("1.3"), "{msg}");
    }

    #[test]
    fn timed_out_reports_query_and_timeout() {
        let err = ProbeError::not_found(
            "/Unity//Launcher",
            NotFoundReason::TimedOut(Duration::from_secs(2)),
        );
        let msg = err.to_string();
        assert!(msg.contains("/Unity//Launcher"));
        assert!(msg.contains("2.0s"));
        assert!(!err.is_no_match());
    }

    #[test]
    fn decode_error_picks_up_attribute_name() {
        let err = ProbeError::decode("bad arity").for_attribute("globalRect");
        assert_eq!(
            err.to_string(),
            "cannot decode value for attribute 'globalRect': bad arity"
        );
    }

    #[test]
    fn ambiguous_proxy_lists_candidates() {
        let err = ProbeError::AmbiguousProxy {
            path: "/App/Button".into(),
            candidates: vec!["OkButton".into(), "CancelButton".into()],
        };
        assert!(err.to_string().ends_with("OkButton, CancelButton"));
    }
}
