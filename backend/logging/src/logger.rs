//! Structured Logger
//!
//! Wraps `tracing` with console output, an optional rolling NDJSON file and
//! `RUST_LOG`-based level control.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use treeprobe_config::defaults::DEFAULT_LOG_LEVEL;
use treeprobe_config::schema::LoggingConfig;

/// Log files are named `treeprobe.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "treeprobe.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`. With `log_dir` set, NDJSON is also written
/// to a daily rolling file there. Returns `false` when a global subscriber
/// was already installed.
pub fn init_logger(log_dir: Option<&Path>, level: &str, json: bool) -> Result<bool> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level '{level}'"))?,
    };

    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stdout));
    let console_text = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_json)
        .with(console_text)
        .with(file_layer)
        .try_init()
        .is_ok();
    Ok(installed)
}

/// Install the global subscriber from the `logging` config section.
pub fn init_from_config(config: &LoggingConfig) -> Result<bool> {
    init_logger(
        config.dir.as_deref().map(Path::new),
        config.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL),
        config.json.unwrap_or(false),
    )
}
