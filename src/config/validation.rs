//! Configuration validation.
//!
//! Serde handles the syntactic side; this pass checks value ranges and
//! addresses and reports every problem it finds, not just the first.

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::{RelayConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} is not a valid address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} is not a valid URL: {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("admin.api_key must be changed before enabling the admin API")]
    PlaceholderApiKey,
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let relay = &config.relay;

    let positive = [
        ("relay.poll_interval_ms", relay.poll_interval_ms == 0),
        ("relay.max_cache_size", relay.max_cache_size == 0),
        ("relay.batch_size", relay.batch_size == 0),
        ("relay.max_retries", relay.max_retries == 0),
        ("relay.publish_timeout_ms", relay.publish_timeout_ms == 0),
        ("relay.channel_capacity", relay.channel_capacity == 0),
    ];
    for (field, is_zero) in positive {
        if is_zero {
            errors.push(ValidationError::Zero(field));
        }
    }

    if url::Url::parse(&config.stream.endpoint).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "stream.endpoint",
            value: config.stream.endpoint.clone(),
        });
    }

    if config.blockchain.enabled {
        if url::Url::parse(&config.blockchain.rpc_url).is_err() {
            errors.push(ValidationError::InvalidUrl {
                field: "blockchain.rpc_url",
                value: config.blockchain.rpc_url.clone(),
            });
        }
        if config.blockchain.log_poll_interval_ms == 0 {
            errors.push(ValidationError::Zero("blockchain.log_poll_interval_ms"));
        }
        for (field, value) in [
            ("contracts.tip_contract", &config.contracts.tip_contract),
            ("contracts.profile_contract", &config.contracts.profile_contract),
        ] {
            if value.parse::<Address>().is_err() {
                errors.push(ValidationError::InvalidAddress {
                    field,
                    value: value.clone(),
                });
            }
        }
    }

    if config.admin.enabled && config.admin.api_key == PLACEHOLDER_API_KEY {
        errors.push(ValidationError::PlaceholderApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = RelayConfig::default();
        config.relay.batch_size = 0;
        config.relay.max_cache_size = 0;
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero("relay.batch_size")));
        assert!(errors.contains(&ValidationError::PlaceholderApiKey));
    }

    #[test]
    fn test_contracts_checked_only_when_chain_enabled() {
        let mut config = RelayConfig::default();
        config.contracts.tip_contract = "not-an-address".into();
        assert!(validate_config(&config).is_ok());

        config.blockchain.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidAddress { field: "contracts.tip_contract", .. }
        )));
    }
}
