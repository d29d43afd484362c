//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: POLL_INTERVAL_MS, BATCH_SIZE, ...)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the relay is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BlockchainConfig, ContractsConfig, LeaderboardConfig, ObservabilityConfig,
    QueueConfig, RelayConfig, StreamConfig,
};
pub use validation::ValidationError;
