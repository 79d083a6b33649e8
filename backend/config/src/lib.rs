//! `treeprobe-config`: runtime configuration for introspection sessions.
//!
//! Provides:
//! - Typed config schema (protocol, polling, query, logging)
//! - YAML loading, with a missing file meaning "all defaults"
//! - Default value application
//! - Validation with errors and warnings

pub mod defaults;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use io::{config_file_path, load_config, write_config, CONFIG_PATH_ENV};
pub use schema::ProbeConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use std::path::Path;

/// Load, apply defaults and validate a config file.
///
/// Warnings are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<ProbeConfig> {
    let config = apply_all_defaults(load_config(path).await?);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        bail!("invalid config at {}: {first}", path.display());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prepares_defaults_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_and_prepare(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(
            config.protocol.unwrap().expected_version.unwrap(),
            defaults::DEFAULT_PROTOCOL_VERSION
        );
    }

    #[tokio::test]
    async fn rejects_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(&path, "polling:\n  intervalMs: 0\n").await.unwrap();
        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(err.to_string().contains("polling.intervalMs"), "{err}");
    }
}
