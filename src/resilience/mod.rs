//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! StreamPublisher::publish:
//!     → per-attempt timeout (tokio::time::timeout)
//!     → On transient failure: retries.rs (fixed delay, bounded attempts)
//!     → On exhaustion: error returned to the drain loop, which requeues
//! ```
//!
//! # Design Decisions
//! - Every call to the streaming service has a deadline
//! - Rejections (4xx) are permanent and never retried in-process
//! - In-process retries never touch the queue entry's attempt counter

pub mod retries;

pub use retries::{RetryExhausted, RetryPolicy, Retryable};
