//! Config defaults: fills unset fields after loading.

use crate::schema::{LoggingConfig, PollingConfig, ProbeConfig, ProtocolConfig, QueryConfig};

/// Wire protocol version spoken by this library.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.4";

/// Sleep between attempts of a polling wait.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Timeout for waits that are not given one explicitly.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Queries returning more nodes than this are logged as too broad.
pub const DEFAULT_LARGE_RESULT_WARNING: usize = 15;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ProbeConfig) -> ProbeConfig {
    let config = apply_protocol_defaults(config);
    let config = apply_polling_defaults(config);
    let config = apply_query_defaults(config);
    apply_logging_defaults(config)
}

fn apply_protocol_defaults(mut config: ProbeConfig) -> ProbeConfig {
    let protocol = config.protocol.get_or_insert_with(ProtocolConfig::default);
    if protocol.expected_version.is_none() {
        protocol.expected_version = Some(DEFAULT_PROTOCOL_VERSION.to_string());
    }
    config
}

fn apply_polling_defaults(mut config: ProbeConfig) -> ProbeConfig {
    let polling = config.polling.get_or_insert_with(PollingConfig::default);
    polling.interval_ms.get_or_insert(DEFAULT_POLL_INTERVAL_MS);
    polling.default_timeout_ms.get_or_insert(DEFAULT_TIMEOUT_MS);
    config
}

fn apply_query_defaults(mut config: ProbeConfig) -> ProbeConfig {
    let query = config.query.get_or_insert_with(QueryConfig::default);
    query.large_result_warning.get_or_insert(DEFAULT_LARGE_RESULT_WARNING);
    query.skip_malformed_nodes.get_or_insert(false);
    config
}

fn apply_logging_defaults(mut config: ProbeConfig) -> ProbeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(ProbeConfig::default());
        assert_eq!(
            cfg.protocol.unwrap().expected_version.unwrap(),
            DEFAULT_PROTOCOL_VERSION
        );
        let polling = cfg.polling.unwrap();
        assert_eq!(polling.interval_ms, Some(DEFAULT_POLL_INTERVAL_MS));
        assert_eq!(polling.default_timeout_ms, Some(DEFAULT_TIMEOUT_MS));
        assert_eq!(
            cfg.query.unwrap().large_result_warning,
            Some(DEFAULT_LARGE_RESULT_WARNING)
        );
        assert_eq!(cfg.logging.unwrap().level.unwrap(), "info");
    }

    #[test]
    fn does_not_override_user_values() {
        let cfg = ProbeConfig {
            polling: Some(PollingConfig {
                interval_ms: Some(40),
                ..Default::default()
            }),
            ..Default::default()
        };
        let polling = apply_all_defaults(cfg).polling.unwrap();
        assert_eq!(polling.interval_ms, Some(40));
        assert_eq!(polling.default_timeout_ms, Some(DEFAULT_TIMEOUT_MS));
    }
}
