//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for environment variable {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides and validate the result.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RelayConfig = toml::from_str(&content)?;

    apply_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply overrides from a variable lookup (the process environment in
/// production).
pub fn apply_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let relay = &mut config.relay;
    override_parsed(&lookup, "POLL_INTERVAL_MS", &mut relay.poll_interval_ms)?;
    override_parsed(&lookup, "MAX_CACHE_SIZE", &mut relay.max_cache_size)?;
    override_parsed(&lookup, "BATCH_SIZE", &mut relay.batch_size)?;
    override_parsed(&lookup, "AUTO_RETRY", &mut relay.auto_retry)?;
    override_parsed(&lookup, "MAX_RETRIES", &mut relay.max_retries)?;
    override_parsed(&lookup, "RETRY_DELAY_MS", &mut relay.retry_delay_ms)?;

    if let Some(key) = lookup("STREAM_API_KEY") {
        config.stream.api_key = Some(key);
    }
    if let Some(key) = lookup("ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
    Ok(())
}

fn override_parsed<F, T>(lookup: &F, var: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(var) {
        *slot = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value })?;
        tracing::debug!(var, "Applied environment override");
    }
    Ok(())
}
