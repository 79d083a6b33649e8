//! Config validation with field paths in every finding.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::ProbeConfig;

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").unwrap());

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ProbeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_protocol(config, &mut report);
    validate_polling(config, &mut report);
    validate_query(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_protocol(config: &ProbeConfig, report: &mut ValidationReport) {
    let Some(protocol) = &config.protocol else { return };
    if let Some(version) = &protocol.expected_version {
        if !VERSION_PATTERN.is_match(version) {
            report.error(
                "protocol.expectedVersion",
                format!("'{version}' is not of the form <major>.<minor>"),
            );
        }
    }
}

fn validate_polling(config: &ProbeConfig, report: &mut ValidationReport) {
    let Some(polling) = &config.polling else { return };
    if polling.interval_ms == Some(0) {
        report.error("polling.intervalMs", "intervalMs must be > 0");
    }
    if polling.default_timeout_ms == Some(0) {
        report.warn(
            "polling.defaultTimeoutMs",
            "A zero timeout makes every wait a single attempt",
        );
    }
    if let (Some(interval), Some(timeout)) = (polling.interval_ms, polling.default_timeout_ms) {
        if interval > timeout {
            report.warn(
                "polling.intervalMs",
                format!("Interval {interval}ms is longer than the default timeout {timeout}ms"),
            );
        }
    }
}

fn validate_query(config: &ProbeConfig, report: &mut ValidationReport) {
    let Some(query) = &config.query else { return };
    if query.large_result_warning == Some(0) {
        report.warn(
            "query.largeResultWarning",
            "Every non-empty result will be reported as too large",
        );
    }
}

fn validate_logging(config: &ProbeConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.error(
                "logging.level",
                format!("Unknown level '{level}'. Use one of {}", LOG_LEVELS.join(", ")),
            );
        }
    }
}
