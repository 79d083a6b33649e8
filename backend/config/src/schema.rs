//! Configuration schema.
//!
//! Every field is optional on disk; [`apply_all_defaults`](crate::apply_all_defaults)
//! fills the gaps after loading.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeConfig {
    /// Wire protocol expectations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolConfig>,

    /// Poll interval and timeouts for `wait_*` operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling: Option<PollingConfig>,

    /// Query execution behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConfig {
    /// `"<major>.<minor>"` the remote side must report from `GetVersion`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    /// Result count above which a query is logged as too broad.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_result_warning: Option<usize>,
    /// Skip nodes that fail to decode instead of failing the whole query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_malformed_nodes: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `trace` | `debug` | `info` | `warn` | `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling log file; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Emit JSON lines on the console instead of human-readable text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
protocol:
  expectedVersion: "1.3"
polling:
  intervalMs: 100
  defaultTimeoutMs: 5000
query:
  largeResultWarning: 40
  skipMalformedNodes: true
logging:
  level: debug
"#;
        let config: ProbeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.protocol.unwrap().expected_version.as_deref(), Some("1.3"));
        let polling = config.polling.unwrap();
        assert_eq!(polling.interval_ms, Some(100));
        assert_eq!(polling.default_timeout_ms, Some(5000));
        assert_eq!(config.query.unwrap().skip_malformed_nodes, Some(true));
        assert_eq!(config.logging.unwrap().level.as_deref(), Some("debug"));
    }

    #[test]
    fn empty_document_is_all_unset() {
        let config: ProbeConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ProbeConfig::default());
    }
}
