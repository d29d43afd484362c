//! Chain integration: RPC client and the log-polling event feed.
//!
//! # Data Flow
//! ```text
//! Config (RPC URLs, chain id, confirmations)
//!     → client.rs (providers with timeouts and failover)
//!     → feed.rs (eth_getLogs polling, sol! event decoding)
//!     → RawEvent channel of the relay's event source
//! ```
//!
//! # Constraints
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when the chain is unreachable

pub mod client;
pub mod feed;
pub mod types;

pub use client::BlockchainClient;
pub use feed::{AlloyEventFeed, DisabledFeed};
pub use types::{BlockchainConfig, BlockchainError, ChainId};
