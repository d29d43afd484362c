//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! ingest task, drain loop, publisher produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (MetricsRegistry atomics, mirrored to the metrics facade)
//!
//! Consumers:
//!     → Relay::get_metrics / admin API (MetricsSnapshot)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Counter updates are single atomic increments on the hot path
//! - Snapshots never take the queue lock

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsRegistry, MetricsSnapshot};
