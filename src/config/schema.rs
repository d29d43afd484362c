//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the contract event relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Queue, drain loop and publish retry settings.
    pub relay: QueueConfig,

    /// Streaming service endpoint.
    pub stream: StreamConfig,

    /// Chain RPC settings.
    pub blockchain: BlockchainConfig,

    /// Watched contract addresses.
    pub contracts: ContractsConfig,

    /// Leaderboard aggregation path.
    pub leaderboard: LeaderboardConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator admin API.
    pub admin: AdminConfig,
}

/// Queue and drain loop configuration.
///
/// Field names follow the relay's recognized options (`POLL_INTERVAL_MS`,
/// `MAX_CACHE_SIZE`, `BATCH_SIZE`, `AUTO_RETRY`, `MAX_RETRIES`,
/// `RETRY_DELAY_MS`), which can also be set from the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Cadence of the drain loop in milliseconds.
    pub poll_interval_ms: u64,

    /// Queue capacity (queued + in-flight entries).
    pub max_cache_size: usize,

    /// Entries drained per tick.
    pub batch_size: usize,

    /// Requeue failed entries (true) or drop them (false).
    pub auto_retry: bool,

    /// In-process publish attempts before a call reports failure.
    pub max_retries: u32,

    /// Fixed delay between in-process publish attempts.
    pub retry_delay_ms: u64,

    /// Per-attempt timeout for a single publish.
    pub publish_timeout_ms: u64,

    /// Capacity of the event delivery channel feeding the ingest task.
    pub channel_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_cache_size: 1_000,
            batch_size: 10,
            auto_retry: true,
            max_retries: 3,
            retry_delay_ms: 1_000,
            publish_timeout_ms: 10_000,
            channel_capacity: 1_024,
        }
    }
}

/// Streaming service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Base URL of the streaming service.
    pub endpoint: String,

    /// Optional bearer key for the streaming service.
    pub api_key: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9400".to_string(),
            api_key: None,
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Enable the on-chain event feed.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Blocks to lag behind the head before reading logs.
    pub confirmation_blocks: u32,

    /// Interval between `eth_getLogs` polls per subscription.
    pub log_poll_interval_ms: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            log_poll_interval_ms: 2_000,
        }
    }
}

/// Addresses of the two watched contracts.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContractsConfig {
    /// Contract emitting `TipSent`.
    pub tip_contract: String,

    /// Contract emitting `ProfileCreated` and `ProfileUpdated`.
    pub profile_contract: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Emit leaderboard-update records after each published tip.
    pub enabled: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON logs instead of human-readable text.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder key rejected by validation when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
