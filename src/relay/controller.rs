//! The relay's public face: lifecycle state machine and operator calls.
//!
//! All state changes go through one `watch` channel. `start` and `stop` win
//! a transition with `send_if_modified`, so concurrent callers either lead
//! the transition or wait for the leader's outcome.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::QueueConfig;
use crate::events::{ChainEventSource, ContractAddresses, EventFeed, Ingestor};
use crate::leaderboard::LeaderboardTally;
use crate::lifecycle::Shutdown;
use crate::observability::{MetricsRegistry, MetricsSnapshot};
use crate::relay::drain::{run_drain_loop, DrainReport, RelayCore};
use crate::relay::error::RelayError;
use crate::relay::publisher::StreamPublisher;
use crate::relay::queue::PublishQueue;
use crate::relay::state::RelayState;
use crate::stream::StreamSink;

struct DrainTask {
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

/// External collaborators of a relay instance.
pub struct RelayDeps {
    pub feed: Arc<dyn EventFeed>,
    pub sink: Arc<dyn StreamSink>,
    pub clock: Arc<dyn Clock>,
    pub leaderboard: Option<LeaderboardTally>,
}

/// Lifecycle state shared with the tasks that run transitions.
struct Lifecycle {
    core: Arc<RelayCore>,
    source: ChainEventSource,
    poll_interval: Duration,
    state: watch::Sender<RelayState>,
    last_start_error: StdMutex<Option<RelayError>>,
    drain: Mutex<Option<DrainTask>>,
}

impl Lifecycle {
    fn transition(&self, to: RelayState) {
        let from = self.state.send_replace(to);
        tracing::info!(from = %from, to = %to, "Relay state changed");
    }

    fn try_transition(&self, from: RelayState, to: RelayState) -> bool {
        let won = self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if won {
            tracing::info!(from = %from, to = %to, "Relay state changed");
        }
        won
    }

    fn set_start_error(&self, error: Option<RelayError>) {
        *self
            .last_start_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }

    fn start_error(&self) -> Option<RelayError> {
        self.last_start_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs with the state already at `Starting`; always leaves it at
    /// `Running` or `Stopped`.
    async fn lead_start(&self) -> Result<(), RelayError> {
        self.set_start_error(None);

        if let Err(e) = self.source.subscribe().await {
            tracing::error!(error = %e, "Relay failed to start");
            self.set_start_error(Some(e.clone()));
            self.transition(RelayState::Stopped);
            return Err(e);
        }

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(run_drain_loop(
            self.core.clone(),
            self.poll_interval,
            shutdown.subscribe(),
        ));
        *self.drain.lock().await = Some(DrainTask { shutdown, handle });

        self.transition(RelayState::Running);
        Ok(())
    }

    /// Runs with the state already at `Stopping`; always ends at `Stopped`.
    async fn lead_stop(&self) {
        if let Some(drain) = self.drain.lock().await.take() {
            drain.shutdown.trigger();
            if let Err(e) = drain.handle.await {
                tracing::error!(error = %e, "Drain loop ended abnormally");
            }
        }
        self.source.unsubscribe().await;
        self.transition(RelayState::Stopped);
    }
}

pub struct Relay {
    inner: Arc<Lifecycle>,
}

impl Relay {
    pub fn new(config: &QueueConfig, contracts: ContractAddresses, deps: RelayDeps) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let queue = Arc::new(PublishQueue::new(config.max_cache_size, deps.clock));
        let publisher = StreamPublisher::from_config(deps.sink, config);
        let ingestor = Ingestor::new(queue.clone(), metrics.clone());
        let source = ChainEventSource::new(deps.feed, contracts, ingestor, config.channel_capacity);
        let core = Arc::new(RelayCore::new(queue, publisher, metrics, config, deps.leaderboard));
        let (state, _) = watch::channel(RelayState::Stopped);

        Self {
            inner: Arc::new(Lifecycle {
                core,
                source,
                poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
                state,
                last_start_error: StdMutex::new(None),
                drain: Mutex::new(None),
            }),
        }
    }

    fn core(&self) -> &RelayCore {
        &self.inner.core
    }

    pub fn state(&self) -> RelayState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<RelayState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to contract events and begin draining.
    ///
    /// A call while another start is in progress returns that attempt's
    /// outcome. Already running is success; stopping is `InvalidState`.
    /// Dropping the returned future does not abandon a transition this call
    /// began: the work runs on its own task and settles the state.
    pub async fn start(&self) -> Result<(), RelayError> {
        let mut rx = self.inner.state.subscribe();
        loop {
            if self
                .inner
                .try_transition(RelayState::Stopped, RelayState::Starting)
            {
                let inner = self.inner.clone();
                let task = tokio::spawn(async move { inner.lead_start().await });
                return match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(error = %e, "Start task ended abnormally");
                        let err = RelayError::Task(e.to_string());
                        self.inner.set_start_error(Some(err.clone()));
                        self.inner.transition(RelayState::Stopped);
                        Err(err)
                    }
                };
            }
            let current = *rx.borrow_and_update();
            match current {
                RelayState::Running => return Ok(()),
                RelayState::Stopping => return Err(RelayError::InvalidState(current)),
                RelayState::Stopped => continue,
                RelayState::Starting => {
                    let settled = match rx.wait_for(|s| *s != RelayState::Starting).await {
                        Ok(state) => *state,
                        Err(_) => return Err(RelayError::InvalidState(RelayState::Stopped)),
                    };
                    return match settled {
                        RelayState::Stopped => Err(self
                            .inner
                            .start_error()
                            .unwrap_or(RelayError::InvalidState(settled))),
                        // Started, possibly already being stopped again.
                        _ => Ok(()),
                    };
                }
            }
        }
    }

    /// Stop draining and unsubscribe. Never fails; a no-op when stopped.
    ///
    /// A drain pass in progress finishes, so entries already taken from the
    /// queue are settled rather than lost. Like `start`, the teardown keeps
    /// running if the caller is dropped.
    pub async fn stop(&self) {
        let mut rx = self.inner.state.subscribe();
        loop {
            if self
                .inner
                .try_transition(RelayState::Running, RelayState::Stopping)
            {
                break;
            }
            let current = *rx.borrow_and_update();
            match current {
                RelayState::Stopped => return,
                RelayState::Running => continue,
                RelayState::Starting | RelayState::Stopping => {
                    if rx.wait_for(|s| *s != current).await.is_err() {
                        return;
                    }
                }
            }
        }

        let inner = self.inner.clone();
        if let Err(e) = tokio::spawn(async move { inner.lead_stop().await }).await {
            tracing::error!(error = %e, "Stop task ended abnormally");
            self.inner.transition(RelayState::Stopped);
        }
    }

    /// Drop every waiting entry. Counters other than depth are untouched.
    pub fn clear_queue(&self) -> usize {
        let removed = self.core().queue().clear();
        self.core().metrics().record_queue_depth(self.core().queue().len());
        tracing::info!(removed, "Publish queue cleared");
        removed
    }

    /// Run one full drain pass over the current queue contents.
    pub async fn retry_queue(&self) -> DrainReport {
        let report = self.core().drain_all().await;
        tracing::info!(
            published = report.published,
            failed = report.failed,
            requeued = report.requeued,
            "Manual drain pass finished"
        );
        report
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        let queue = self.core().queue();
        self.core().metrics().snapshot(queue.len(), queue.in_flight())
    }

    /// Waiting entries' attempt counters, head first.
    pub fn queue_attempts(&self) -> Vec<u32> {
        self.core().queue().attempts()
    }

    pub fn leaderboard(&self) -> Option<&LeaderboardTally> {
        self.core().leaderboard()
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("state", &self.state())
            .field("queue", self.core().queue())
            .finish()
    }
}
