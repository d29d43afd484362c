//! Drain passes: move queued records to the stream.
//!
//! A pass takes entries from the head of the queue, publishes them one at a
//! time in FIFO order and settles each batch before taking the next. Passes
//! are serialized, so the periodic loop and a manual `retry_queue` never
//! interleave.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::config::QueueConfig;
use crate::leaderboard::LeaderboardTally;
use crate::lifecycle::ShutdownSignal;
use crate::observability::MetricsRegistry;
use crate::relay::publisher::StreamPublisher;
use crate::relay::queue::{PublishQueue, QueueEntry};
use crate::schema::NormalizedRecord;

/// Outcome counts of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub published: usize,
    pub failed: usize,
    pub requeued: usize,
    pub dropped: usize,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.published + self.failed
    }

    fn merge(&mut self, other: DrainReport) {
        self.published += other.published;
        self.failed += other.failed;
        self.requeued += other.requeued;
        self.dropped += other.dropped;
    }
}

/// Queue, publisher and counters shared by the drain loop and operator calls.
pub struct RelayCore {
    queue: Arc<PublishQueue>,
    publisher: StreamPublisher,
    metrics: Arc<MetricsRegistry>,
    batch_size: usize,
    auto_retry: bool,
    leaderboard: Option<LeaderboardTally>,
    pass_lock: Mutex<()>,
}

impl RelayCore {
    pub fn new(
        queue: Arc<PublishQueue>,
        publisher: StreamPublisher,
        metrics: Arc<MetricsRegistry>,
        config: &QueueConfig,
        leaderboard: Option<LeaderboardTally>,
    ) -> Self {
        Self {
            queue,
            publisher,
            metrics,
            batch_size: config.batch_size.max(1),
            auto_retry: config.auto_retry,
            leaderboard,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn queue(&self) -> &Arc<PublishQueue> {
        &self.queue
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn leaderboard(&self) -> Option<&LeaderboardTally> {
        self.leaderboard.as_ref()
    }

    /// One periodic tick: publish at most one batch.
    pub async fn drain_tick(&self) -> DrainReport {
        let _pass = self.pass_lock.lock().await;
        let batch = self.queue.dequeue_batch(self.batch_size);
        if batch.is_empty() {
            return DrainReport::default();
        }
        self.settle_batch(batch).await
    }

    /// Give every entry waiting at the start of the call one publish attempt.
    ///
    /// Entries enqueued or requeued during the pass are left for later. A
    /// `clear` during the pass ends it, so records that arrive after the
    /// clear are not picked up.
    pub async fn drain_all(&self) -> DrainReport {
        let _pass = self.pass_lock.lock().await;
        let generation = self.queue.generation();
        let mut remaining = self.queue.len();
        let mut report = DrainReport::default();

        while remaining > 0 {
            let batch = self
                .queue
                .dequeue_batch_since(self.batch_size.min(remaining), generation);
            if batch.is_empty() {
                // Cleared underneath us.
                break;
            }
            remaining -= batch.len();
            report.merge(self.settle_batch(batch).await);
        }
        report
    }

    async fn settle_batch(&self, batch: Vec<QueueEntry>) -> DrainReport {
        let mut report = DrainReport::default();
        let mut failed = Vec::new();

        for entry in batch {
            let kind = entry.record.kind();
            match self.publisher.publish(&entry.record).await {
                Ok(()) => {
                    self.metrics.record_published(kind);
                    self.queue.complete(1);
                    report.published += 1;
                    self.follow_up(&entry.record);
                }
                Err(e) => {
                    tracing::warn!(
                        record = %kind,
                        entry = %entry.id,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "Publish failed"
                    );
                    self.metrics.record_publish_error();
                    report.failed += 1;
                    failed.push(entry);
                }
            }
        }

        if !failed.is_empty() {
            if self.auto_retry {
                report.requeued = failed.len();
                self.queue.requeue(failed);
            } else {
                report.dropped = failed.len();
                for entry in &failed {
                    tracing::warn!(record = %entry.record.kind(), entry = %entry.id, "Dropping failed record");
                    self.metrics.record_dropped();
                }
                self.queue.complete(failed.len());
            }
        }

        self.metrics.record_queue_depth(self.queue.len());
        tracing::debug!(
            published = report.published,
            failed = report.failed,
            depth = self.queue.len(),
            "Drain batch settled"
        );
        report
    }

    /// Derived records for a confirmed publish.
    fn follow_up(&self, record: &NormalizedRecord) {
        let (Some(tally), NormalizedRecord::Tip(tip)) = (&self.leaderboard, record) else {
            return;
        };
        for update in tally.record_tip(tip) {
            if let Err(e) = self
                .queue
                .enqueue(NormalizedRecord::LeaderboardUpdate(update))
            {
                tracing::warn!(error = %e, "Leaderboard update dropped");
                self.metrics.record_overflow();
            }
        }
    }
}

/// Periodic drain until `stop` fires. A pass already running completes.
pub async fn run_drain_loop(core: Arc<RelayCore>, poll_interval: Duration, mut stop: ShutdownSignal) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so the first pass runs one
    // interval after start.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                core.drain_tick().await;
            }
            _ = stop.recv() => break,
        }
    }
    tracing::debug!("Drain loop exiting");
}
