//! The contract event relay core.
//!
//! # Data Flow
//! ```text
//! ChainEventSource ──ingest──▶ PublishQueue ◀──drain loop──▶ StreamPublisher ──▶ StreamSink
//!                                   ▲                              │
//!                                   └──────── requeue on failure ◀─┘
//! ```
//!
//! `Relay` (controller.rs) is the only type callers need: it owns the
//! queue, counters, event source and drain loop of one instance.

pub mod controller;
pub mod drain;
pub mod error;
pub mod publisher;
pub mod queue;
pub mod state;

pub use controller::{Relay, RelayDeps};
pub use drain::{DrainReport, RelayCore};
pub use error::{PublishError, QueueFullError, RelayError};
pub use publisher::StreamPublisher;
pub use queue::{PublishQueue, QueueEntry};
pub use state::RelayState;
