//! Bounded FIFO of records awaiting a confirmed publish.
//!
//! # Capacity
//! Entries taken by a drain pass stay reserved ("in flight") until they are
//! settled with `complete` or `requeue`, so the bound covers every
//! unconfirmed record. `requeue` never fails: those entries already hold
//! their slot.
//!
//! # Ordering
//! FIFO on arrival. A failed entry goes back to the tail, so it may end up
//! behind records that arrived while it was being published.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::clock::Clock;
use crate::relay::error::QueueFullError;
use crate::schema::NormalizedRecord;

/// A record plus its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: Uuid,
    pub record: NormalizedRecord,
    /// Milliseconds since the epoch when the record was captured.
    pub enqueued_at: u64,
    /// Failed publish calls so far. Never decreases.
    pub attempts: u32,
}

#[derive(Debug, Default)]
struct Inner {
    entries: VecDeque<QueueEntry>,
    in_flight: usize,
    /// Bumped by every `clear`.
    generation: u64,
}

pub struct PublishQueue {
    capacity: usize,
    inner: Mutex<Inner>,
    depth: AtomicUsize,
    in_flight: AtomicUsize,
    clock: Arc<dyn Clock>,
}

impl PublishQueue {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
            depth: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_counts(&self, inner: &Inner) {
        self.depth.store(inner.entries.len(), Ordering::Relaxed);
        self.in_flight.store(inner.in_flight, Ordering::Relaxed);
    }

    /// Append a record at the tail, or reject it when the queue is full.
    pub fn enqueue(&self, record: NormalizedRecord) -> Result<Uuid, QueueFullError> {
        let mut inner = self.lock();
        if inner.entries.len() + inner.in_flight >= self.capacity {
            return Err(QueueFullError {
                capacity: self.capacity,
                kind: record.kind(),
            });
        }
        let id = Uuid::new_v4();
        inner.entries.push_back(QueueEntry {
            id,
            record,
            enqueued_at: self.clock.now_millis(),
            attempts: 0,
        });
        self.publish_counts(&inner);
        Ok(id)
    }

    /// Remove up to `n` entries from the head and mark them in flight.
    pub fn dequeue_batch(&self, n: usize) -> Vec<QueueEntry> {
        let mut inner = self.lock();
        self.take_head(&mut inner, n)
    }

    /// Like `dequeue_batch`, but takes nothing if the queue was cleared since
    /// `generation` was read.
    pub fn dequeue_batch_since(&self, n: usize, generation: u64) -> Vec<QueueEntry> {
        let mut inner = self.lock();
        if inner.generation != generation {
            return Vec::new();
        }
        self.take_head(&mut inner, n)
    }

    fn take_head(&self, inner: &mut Inner, n: usize) -> Vec<QueueEntry> {
        let take = n.min(inner.entries.len());
        let batch: Vec<QueueEntry> = inner.entries.drain(..take).collect();
        inner.in_flight += batch.len();
        self.publish_counts(inner);
        batch
    }

    /// Counter identifying the current contents epoch; changes on `clear`.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Return failed in-flight entries to the tail, bumping their attempts.
    pub fn requeue(&self, entries: Vec<QueueEntry>) {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(entries.len());
        inner.entries.extend(entries.into_iter().map(|mut entry| {
            entry.attempts += 1;
            entry
        }));
        self.publish_counts(&inner);
    }

    /// Release `n` in-flight entries that were published or dropped.
    pub fn complete(&self, n: usize) {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(n);
        self.publish_counts(&inner);
    }

    /// Drop every waiting entry. In-flight entries settle normally.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.generation += 1;
        self.publish_counts(&inner);
        removed
    }

    /// Entries waiting in the queue.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attempt counters of the waiting entries, head first.
    pub fn attempts(&self) -> Vec<u32> {
        self.lock().entries.iter().map(|e| e.attempts).collect()
    }
}

impl std::fmt::Debug for PublishQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::schema::{ProfileCreatedData, RecordKind};
    use alloy::primitives::{Address, B256, U256};

    fn record(n: u8) -> NormalizedRecord {
        NormalizedRecord::ProfileCreated(ProfileCreatedData {
            userAddress: Address::repeat_byte(n),
            username: format!("user{n}"),
            creditScore: U256::from(n),
            timestamp: n as u64,
            txHash: B256::repeat_byte(n),
        })
    }

    fn queue(capacity: usize) -> PublishQueue {
        PublishQueue::new(capacity, Arc::new(SystemClock))
    }

    #[test]
    fn test_fifo_batches() {
        let q = queue(10);
        for n in 1..=5 {
            q.enqueue(record(n)).unwrap();
        }
        let first = q.dequeue_batch(2);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].record, record(1));
        assert_eq!(first[1].record, record(2));
        assert_eq!(q.len(), 3);
        assert_eq!(q.in_flight(), 2);

        let rest = q.dequeue_batch(10);
        assert_eq!(rest.len(), 3);
        assert!(q.is_empty());
    }

    #[test]
    fn test_rejects_when_full() {
        let q = queue(2);
        q.enqueue(record(1)).unwrap();
        q.enqueue(record(2)).unwrap();
        let err = q.enqueue(record(3)).unwrap_err();
        assert_eq!(err.capacity, 2);
        assert_eq!(err.kind, RecordKind::ProfileCreated);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_in_flight_holds_capacity() {
        let q = queue(2);
        q.enqueue(record(1)).unwrap();
        q.enqueue(record(2)).unwrap();
        let batch = q.dequeue_batch(2);
        assert!(q.enqueue(record(3)).is_err());

        q.complete(1);
        q.enqueue(record(3)).unwrap();

        q.requeue(batch.into_iter().skip(1).collect());
        assert_eq!(q.len(), 2);
        assert_eq!(q.in_flight(), 0);
    }

    #[test]
    fn test_requeue_appends_with_attempts() {
        let q = queue(10);
        q.enqueue(record(1)).unwrap();
        q.enqueue(record(2)).unwrap();
        let batch = q.dequeue_batch(2);
        q.enqueue(record(3)).unwrap();
        q.requeue(batch);

        let order: Vec<_> = q.dequeue_batch(3).into_iter().map(|e| e.record).collect();
        assert_eq!(order, vec![record(3), record(1), record(2)]);
    }

    #[test]
    fn test_attempts_only_increase() {
        let q = queue(10);
        q.enqueue(record(1)).unwrap();
        for expected in 1..=3 {
            let batch = q.dequeue_batch(1);
            q.requeue(batch);
            assert_eq!(q.attempts(), vec![expected]);
        }
    }

    #[test]
    fn test_dequeue_since_stops_after_clear() {
        let q = queue(10);
        q.enqueue(record(1)).unwrap();
        let generation = q.generation();
        assert_eq!(q.dequeue_batch_since(1, generation).len(), 1);

        q.enqueue(record(2)).unwrap();
        q.clear();
        q.enqueue(record(3)).unwrap();
        assert!(q.dequeue_batch_since(1, generation).is_empty());
        assert_eq!(q.len(), 1);
        assert_eq!(q.dequeue_batch_since(1, q.generation()).len(), 1);
    }

    #[test]
    fn test_clear_returns_count() {
        let q = queue(10);
        q.enqueue(record(1)).unwrap();
        q.enqueue(record(2)).unwrap();
        assert_eq!(q.clear(), 2);
        assert_eq!(q.len(), 0);
        assert_eq!(q.clear(), 0);
    }
}
