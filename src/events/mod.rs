//! Contract events: raw shapes, normalization and the subscription source.
//!
//! # Data Flow
//! ```text
//! EventFeed (blockchain::feed or a test double)
//!     → mpsc channel (one per session)
//!     → ingest task: normalize → PublishQueue::enqueue
//! ```

pub mod normalizer;
pub mod raw;
pub mod source;

pub use normalizer::{normalize, MalformedEventError};
pub use raw::{EventKind, LogMeta, RawEvent, RawProfileCreated, RawProfileUpdated, RawTipSent};
pub use source::{
    ChainEventSource, ContractAddresses, EventFeed, EventFilter, FeedError, IngestOutcome,
    Ingestor, Subscription,
};
