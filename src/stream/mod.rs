//! Streaming service client.
//!
//! # Data Flow
//! ```text
//! StreamPublisher
//!     → StreamSink::append(StreamPayload)
//!     → http.rs (POST {endpoint}/streams/{schemaId}/records)
//!     → append-only stream
//! ```
//!
//! # Design Decisions
//! - The sink is a trait object so tests and alternative transports can be
//!   swapped in without touching the relay
//! - The sink makes exactly one attempt; retry policy lives in the publisher

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::resilience::Retryable;
use crate::schema::StreamPayload;

pub use http::HttpStreamSink;

/// Errors from a single append attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Worth retrying: transport failure, timeout, 5xx, 408 or 429.
    #[error("transient stream error: {0}")]
    Transient(String),

    /// The service refused the payload; retrying will not help.
    #[error("stream rejected payload: {0}")]
    Rejected(String),
}

impl Retryable for SinkError {
    fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transient(_))
    }
}

/// The external append-only streaming service.
#[async_trait]
pub trait StreamSink: Send + Sync {
    async fn append(&self, payload: &StreamPayload) -> Result<(), SinkError>;
}
