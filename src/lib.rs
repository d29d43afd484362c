//! Contract event relay.
//!
//! Watches the tipping and profile contracts, normalizes their events into
//! the published wire schemas and forwards them to an append-only streaming
//! service, buffering unconfirmed records in a bounded retry queue.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌────────────┐   RawEvent   ┌──────────────┐  enqueue  ┌──────────────┐
//!   │ blockchain │─────────────▶│    events    │──────────▶│ relay::queue │
//!   │  (feed)    │   channel    │ (normalizer) │           └──────┬───────┘
//!   └────────────┘              └──────────────┘                  │ drain loop
//!                                                                 ▼
//!   ┌────────────┐   payload    ┌──────────────┐  publish  ┌──────────────┐
//!   │  stream    │◀─────────────│    schema    │◀──────────│relay::publish│
//!   │  (sink)    │              │  (encoder)   │           └──────────────┘
//!   └────────────┘              └──────────────┘
//!
//!   Cross-cutting: config, observability, resilience, lifecycle, admin
//! ```

// Core
pub mod events;
pub mod relay;
pub mod schema;

// Collaborators
pub mod blockchain;
pub mod stream;

// Cross-cutting concerns
pub mod admin;
pub mod clock;
pub mod config;
pub mod leaderboard;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::RelayConfig;
pub use relay::{Relay, RelayDeps, RelayError, RelayState};
