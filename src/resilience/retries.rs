//! Bounded in-process retries with a fixed delay.
//!
//! # Responsibilities
//! - Run an operation up to `max_attempts` times
//! - Retry only errors that report themselves as transient
//! - Sleep a fixed delay between attempts (no backoff growth)

use std::future::Future;
use std::time::Duration;

use crate::config::QueueConfig;

/// Classifies errors for the retry loop.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Outcome of a retried operation that never succeeded.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() || attempt >= self.max_attempts => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError(bool);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "transient={}", self.0)
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(TestError(true))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let err = policy
            .run(|_| async { Err::<(), _>(TestError(true)) })
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let err = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(TestError(false)) }
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
