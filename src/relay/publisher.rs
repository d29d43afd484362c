//! Publishes one record to the streaming service.
//!
//! Each attempt is bounded by a timeout; transient failures are retried in
//! process with a fixed delay. The publisher never touches the queue:
//! requeueing an unrecovered failure is the drain loop's job.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::config::QueueConfig;
use crate::relay::error::PublishError;
use crate::resilience::RetryPolicy;
use crate::schema::{NormalizedRecord, SchemaEncoder};
use crate::stream::{SinkError, StreamSink};

pub struct StreamPublisher {
    sink: Arc<dyn StreamSink>,
    encoder: SchemaEncoder,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl StreamPublisher {
    pub fn new(sink: Arc<dyn StreamSink>, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            sink,
            encoder: SchemaEncoder::new(),
            policy,
            attempt_timeout,
        }
    }

    pub fn from_config(sink: Arc<dyn StreamSink>, config: &QueueConfig) -> Self {
        Self::new(
            sink,
            RetryPolicy::from_config(config),
            Duration::from_millis(config.publish_timeout_ms),
        )
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn publish(&self, record: &NormalizedRecord) -> Result<(), PublishError> {
        let payload = self.encoder.encode(record);
        let kind = payload.kind;
        let payload = &payload;

        let outcome = self
            .policy
            .run(|attempt| async move {
                let result = match timeout(self.attempt_timeout, self.sink.append(payload)).await {
                    Ok(result) => result,
                    Err(_) => Err(SinkError::Transient(format!(
                        "no response within {}ms",
                        self.attempt_timeout.as_millis()
                    ))),
                };
                if let Err(e) = &result {
                    tracing::debug!(record = %kind, attempt, error = %e, "Publish attempt failed");
                }
                result
            })
            .await;

        match outcome {
            Ok(()) => {
                tracing::trace!(record = %kind, data_id = %payload.data_id, "Record published");
                Ok(())
            }
            Err(exhausted) => match exhausted.last_error {
                SinkError::Rejected(_) => Err(PublishError::Rejected {
                    kind,
                    source: exhausted.last_error,
                }),
                SinkError::Transient(_) => Err(PublishError::Exhausted {
                    kind,
                    attempts: exhausted.attempts,
                    last: exhausted.last_error,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ProfileCreatedData, StreamPayload};
    use alloy::primitives::{Address, B256, U256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls with `error`, then succeeds.
    struct FlakySink {
        failures: u32,
        error: SinkError,
        calls: AtomicU32,
    }

    #[async_trait]
    impl StreamSink for FlakySink {
        async fn append(&self, _payload: &StreamPayload) -> Result<(), SinkError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(())
            }
        }
    }

    struct HangingSink;

    #[async_trait]
    impl StreamSink for HangingSink {
        async fn append(&self, _payload: &StreamPayload) -> Result<(), SinkError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn record() -> NormalizedRecord {
        NormalizedRecord::ProfileCreated(ProfileCreatedData {
            userAddress: Address::ZERO,
            username: "dave".into(),
            creditScore: U256::from(1),
            timestamp: 1,
            txHash: B256::ZERO,
        })
    }

    fn publisher(sink: Arc<dyn StreamSink>, attempts: u32) -> StreamPublisher {
        StreamPublisher::new(
            sink,
            RetryPolicy::new(attempts, Duration::from_millis(1)),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_recovers_within_one_call() {
        let sink = Arc::new(FlakySink {
            failures: 2,
            error: SinkError::Transient("503".into()),
            calls: AtomicU32::new(0),
        });
        publisher(sink.clone(), 3).publish(&record()).await.unwrap();
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let sink = Arc::new(FlakySink {
            failures: u32::MAX,
            error: SinkError::Transient("503".into()),
            calls: AtomicU32::new(0),
        });
        let err = publisher(sink.clone(), 3).publish(&record()).await.unwrap_err();
        assert!(matches!(err, PublishError::Exhausted { attempts: 3, .. }));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejection_not_retried() {
        let sink = Arc::new(FlakySink {
            failures: u32::MAX,
            error: SinkError::Rejected("400".into()),
            calls: AtomicU32::new(0),
        });
        let err = publisher(sink.clone(), 3).publish(&record()).await.unwrap_err();
        assert!(matches!(err, PublishError::Rejected { .. }));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_transient() {
        let err = publisher(Arc::new(HangingSink), 2)
            .publish(&record())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Exhausted { attempts: 2, .. }));
    }
}
