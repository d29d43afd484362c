//! Owns the three contract event subscriptions and the ingest task.
//!
//! Every subscription pushes into one bounded channel; a single ingest task
//! drains it, normalizes each event and enqueues the record. Normalization
//! runs outside the queue lock.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{ContractsConfig, ValidationError};
use crate::events::normalizer::{normalize, MalformedEventError};
use crate::events::raw::{EventKind, RawEvent};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::MetricsRegistry;
use crate::relay::error::{QueueFullError, RelayError};
use crate::relay::queue::PublishQueue;

/// Errors reported by a chain client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("chain unreachable: {0}")]
    Unavailable(String),

    #[error("subscription refused: {0}")]
    Refused(String),
}

/// Which logs a subscription delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    pub kind: EventKind,
    pub contract: Address,
}

/// Addresses of the tipping and profile contracts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractAddresses {
    pub tip_contract: Address,
    pub profile_contract: Address,
}

impl ContractAddresses {
    /// Parse the configured addresses. Empty strings map to the zero address.
    pub fn from_config(config: &ContractsConfig) -> Result<Self, ValidationError> {
        let parse = |field: &'static str, value: &str| -> Result<Address, ValidationError> {
            if value.is_empty() {
                return Ok(Address::ZERO);
            }
            value.parse().map_err(|_| ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            })
        };
        Ok(Self {
            tip_contract: parse("contracts.tip_contract", &config.tip_contract)?,
            profile_contract: parse("contracts.profile_contract", &config.profile_contract)?,
        })
    }

    pub fn filters(&self) -> [EventFilter; 3] {
        [
            EventFilter {
                kind: EventKind::TipSent,
                contract: self.tip_contract,
            },
            EventFilter {
                kind: EventKind::ProfileCreated,
                contract: self.profile_contract,
            },
            EventFilter {
                kind: EventKind::ProfileUpdated,
                contract: self.profile_contract,
            },
        ]
    }
}

/// Chain client delivering decoded contract events.
///
/// Reconnecting after a transport drop is the feed's own business.
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Fails when there is no usable chain link.
    async fn check_connection(&self) -> Result<(), FeedError>;

    /// Start delivering events matching `filter` into `events`.
    async fn subscribe(
        &self,
        filter: EventFilter,
        events: mpsc::Sender<RawEvent>,
    ) -> Result<Subscription, FeedError>;
}

/// Handle to one live subscription.
#[derive(Debug)]
pub struct Subscription {
    kind: EventKind,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A subscription driven by `task`, stopped through `cancel`.
    pub fn new(kind: EventKind, cancel: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            kind,
            cancel: Some(cancel),
            task: Some(task),
        }
    }

    /// A subscription with nothing to tear down (push-based feeds).
    pub fn passive(kind: EventKind) -> Self {
        Self {
            kind,
            cancel: None,
            task: None,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Stop delivery and wait for the feed task to exit.
    pub async fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(event = %self.kind, error = %e, "Subscription task ended abnormally");
            }
        }
    }
}

/// What happened to one delivered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Enqueued(Uuid),
    Malformed(MalformedEventError),
    Overflow(QueueFullError),
}

/// Normalize-and-enqueue step shared by the ingest task and tests.
#[derive(Clone)]
pub struct Ingestor {
    queue: Arc<PublishQueue>,
    metrics: Arc<MetricsRegistry>,
}

impl Ingestor {
    pub fn new(queue: Arc<PublishQueue>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { queue, metrics }
    }

    pub fn ingest(&self, event: RawEvent) -> IngestOutcome {
        let kind = event.kind();
        self.metrics.record_detected(kind);

        let record = match normalize(event) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(event = %kind, error = %e, "Dropping malformed event");
                self.metrics.record_decode_error(kind);
                return IngestOutcome::Malformed(e);
            }
        };

        match self.queue.enqueue(record) {
            Ok(id) => {
                tracing::debug!(event = %kind, entry = %id, depth = self.queue.len(), "Event queued");
                self.metrics.record_queue_depth(self.queue.len());
                IngestOutcome::Enqueued(id)
            }
            Err(e) => {
                tracing::warn!(event = %kind, error = %e, "Queue overflow, event dropped");
                self.metrics.record_overflow();
                IngestOutcome::Overflow(e)
            }
        }
    }
}

struct Session {
    subscriptions: Vec<Subscription>,
    shutdown: Shutdown,
    ingest: JoinHandle<()>,
}

pub struct ChainEventSource {
    feed: Arc<dyn EventFeed>,
    contracts: ContractAddresses,
    ingestor: Ingestor,
    channel_capacity: usize,
    session: Mutex<Option<Session>>,
}

impl ChainEventSource {
    pub fn new(
        feed: Arc<dyn EventFeed>,
        contracts: ContractAddresses,
        ingestor: Ingestor,
        channel_capacity: usize,
    ) -> Self {
        Self {
            feed,
            contracts,
            ingestor,
            channel_capacity: channel_capacity.max(1),
            session: Mutex::new(None),
        }
    }

    pub async fn is_subscribed(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Open the three subscriptions and start the ingest task.
    ///
    /// A second call while subscribed is a no-op. If any subscription fails
    /// the ones already opened are cancelled before returning the error.
    pub async fn subscribe(&self) -> Result<(), RelayError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            tracing::debug!("Event source already subscribed");
            return Ok(());
        }

        self.feed
            .check_connection()
            .await
            .map_err(|e| RelayError::Connection(e.to_string()))?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let mut subscriptions = Vec::with_capacity(3);
        for filter in self.contracts.filters() {
            match self.feed.subscribe(filter, tx.clone()).await {
                Ok(sub) => subscriptions.push(sub),
                Err(e) => {
                    for sub in subscriptions {
                        sub.cancel().await;
                    }
                    return Err(RelayError::Subscribe {
                        event: filter.kind.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        drop(tx);

        let shutdown = Shutdown::new();
        let ingest = tokio::spawn(run_ingest(self.ingestor.clone(), rx, shutdown.subscribe()));

        tracing::info!(
            tip_contract = %self.contracts.tip_contract,
            profile_contract = %self.contracts.profile_contract,
            "Subscribed to contract events"
        );
        *session = Some(Session {
            subscriptions,
            shutdown,
            ingest,
        });
        Ok(())
    }

    /// Cancel the subscriptions, then let the ingest task drain what was
    /// already delivered. No-op when not subscribed.
    pub async fn unsubscribe(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };

        for sub in session.subscriptions {
            sub.cancel().await;
        }
        session.shutdown.trigger();
        if let Err(e) = session.ingest.await {
            tracing::error!(error = %e, "Ingest task ended abnormally");
        }
        tracing::info!("Unsubscribed from contract events");
    }
}

async fn run_ingest(ingestor: Ingestor, mut rx: mpsc::Receiver<RawEvent>, mut stop: ShutdownSignal) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    ingestor.ingest(event);
                }
                None => break,
            },
            _ = stop.recv() => {
                rx.close();
                while let Ok(event) = rx.try_recv() {
                    ingestor.ingest(event);
                }
                break;
            }
        }
    }
    tracing::debug!("Ingest task exiting");
}
