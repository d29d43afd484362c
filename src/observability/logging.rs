//! Structured logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level. JSON output is
//! meant for log aggregation, the default text format for local runs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

fn default_directives(level: &str) -> String {
    format!("{level},tip_relay={level},tower_http=info")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        assert!(EnvFilter::try_new(default_directives("debug")).is_ok());
    }
}
