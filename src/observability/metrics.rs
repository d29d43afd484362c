//! Relay counters and Prometheus exposition.
//!
//! # Metrics
//! - `relay_events_detected_total` (counter): chain events seen, by `event`
//! - `relay_records_published_total` (counter): confirmed publishes, by `record`
//! - `relay_publish_errors_total` (counter): failed publish calls and overflow rejects
//! - `relay_decode_errors_total` (counter): malformed events dropped; `stage="abi"`
//!   marks chain logs the feed could not decode (exporter only, not in snapshots)
//! - `relay_queue_overflow_total` (counter): enqueues rejected by a full queue
//! - `relay_records_dropped_total` (counter): failed records discarded with auto-retry off
//! - `relay_queue_depth` (gauge): entries waiting in the queue
//! - `relay_chain_rpc_healthy` (gauge): 1 when an RPC provider answers (set by the chain client)
//!
//! `MetricsRegistry` is the source of truth for `Relay::get_metrics`; every
//! increment is mirrored into the `metrics` facade for the exporter.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::{Deserialize, Serialize};

use crate::events::EventKind;
use crate::schema::RecordKind;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Atomic counters for one relay instance.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    detected: [AtomicU64; 3],
    published: [AtomicU64; 4],
    publish_errors: AtomicU64,
    decode_errors: AtomicU64,
    overflow_drops: AtomicU64,
    dropped: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_detected(&self, kind: EventKind) {
        self.detected[kind.index()].fetch_add(1, Ordering::Relaxed);
        counter!("relay_events_detected_total", "event" => kind.as_str()).increment(1);
    }

    pub fn record_published(&self, kind: RecordKind) {
        self.published[kind.index()].fetch_add(1, Ordering::Relaxed);
        counter!("relay_records_published_total", "record" => kind.as_str()).increment(1);
    }

    pub fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
        counter!("relay_publish_errors_total").increment(1);
    }

    pub fn record_decode_error(&self, kind: EventKind) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
        counter!("relay_decode_errors_total", "event" => kind.as_str()).increment(1);
    }

    /// A full queue rejected a record. Also counts as a publish error.
    pub fn record_overflow(&self) {
        self.overflow_drops.fetch_add(1, Ordering::Relaxed);
        counter!("relay_queue_overflow_total").increment(1);
        self.record_publish_error();
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        counter!("relay_records_dropped_total").increment(1);
    }

    pub fn record_queue_depth(&self, depth: usize) {
        gauge!("relay_queue_depth").set(depth as f64);
    }

    /// Read all counters. `queue_size` and `in_flight` come from the queue.
    pub fn snapshot(&self, queue_size: usize, in_flight: usize) -> MetricsSnapshot {
        let detected = |k: EventKind| self.detected[k.index()].load(Ordering::Relaxed);
        let published = |k: RecordKind| self.published[k.index()].load(Ordering::Relaxed);

        MetricsSnapshot {
            detected: DetectedCounts {
                tip_sent: detected(EventKind::TipSent),
                profile_created: detected(EventKind::ProfileCreated),
                profile_updated: detected(EventKind::ProfileUpdated),
            },
            published: PublishedCounts {
                tip: published(RecordKind::Tip),
                profile_created: published(RecordKind::ProfileCreated),
                profile_updated: published(RecordKind::ProfileUpdated),
                leaderboard_update: published(RecordKind::LeaderboardUpdate),
            },
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            overflow_drops: self.overflow_drops.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            queue_size,
            in_flight,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedCounts {
    pub tip_sent: u64,
    pub profile_created: u64,
    pub profile_updated: u64,
}

impl DetectedCounts {
    pub fn get(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::TipSent => self.tip_sent,
            EventKind::ProfileCreated => self.profile_created,
            EventKind::ProfileUpdated => self.profile_updated,
        }
    }

    pub fn total(&self) -> u64 {
        self.tip_sent + self.profile_created + self.profile_updated
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedCounts {
    pub tip: u64,
    pub profile_created: u64,
    pub profile_updated: u64,
    pub leaderboard_update: u64,
}

impl PublishedCounts {
    pub fn get(&self, kind: RecordKind) -> u64 {
        match kind {
            RecordKind::Tip => self.tip,
            RecordKind::ProfileCreated => self.profile_created,
            RecordKind::ProfileUpdated => self.profile_updated,
            RecordKind::LeaderboardUpdate => self.leaderboard_update,
        }
    }

    pub fn total(&self) -> u64 {
        self.tip + self.profile_created + self.profile_updated + self.leaderboard_update
    }
}

/// Point-in-time view of the relay's health counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub detected: DetectedCounts,
    pub published: PublishedCounts,
    pub publish_errors: u64,
    pub decode_errors: u64,
    pub overflow_drops: u64,
    pub dropped: u64,
    /// Entries waiting in the queue.
    pub queue_size: usize,
    /// Entries taken by a drain pass and not yet settled.
    pub in_flight: usize,
}
