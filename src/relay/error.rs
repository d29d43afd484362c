//! Relay error taxonomy.

use thiserror::Error;

use crate::relay::state::RelayState;
use crate::schema::RecordKind;
use crate::stream::SinkError;

/// Caller-visible lifecycle failures.
///
/// `Clone` so that coalesced `start()` callers receive the leader's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// No active chain link when starting.
    #[error("chain connection unavailable: {0}")]
    Connection(String),

    /// The chain client refused a subscription.
    #[error("failed to subscribe to {event}: {reason}")]
    Subscribe { event: String, reason: String },

    #[error("operation not valid while relay is {0}")]
    InvalidState(RelayState),

    /// The task driving a lifecycle transition panicked.
    #[error("lifecycle task failed: {0}")]
    Task(String),
}

/// The queue was at capacity; the record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("publish queue full (capacity {capacity}), {kind} record rejected")]
pub struct QueueFullError {
    pub capacity: usize,
    pub kind: RecordKind,
}

/// A publish call that did not reach the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The service refused the payload.
    #[error("{kind} record rejected by stream: {source}")]
    Rejected { kind: RecordKind, source: SinkError },

    /// Every in-process attempt failed transiently.
    #[error("{kind} record failed after {attempts} attempts: {last}")]
    Exhausted {
        kind: RecordKind,
        attempts: u32,
        last: SinkError,
    },
}
