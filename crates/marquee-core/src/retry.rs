//! Bounded exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::error::{ProviderError, ProviderResult};

/// How many times, and how patiently, a transient failure is retried.
///
/// Only errors for which [`ProviderError::is_transient`] holds are
/// retried; auth and validation failures surface immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    /// Run `call`, retrying transient failures.
    ///
    /// `operation` names the call in retry log lines.
    pub async fn run<T, F, Fut>(&self, operation: &str, call: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        call.retry(self.backoff())
            .when(ProviderError::is_transient)
            .notify(|err: &ProviderError, delay: Duration| {
                log::warn!("{} failed ({}); retrying in {:?}", operation, err, delay);
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Provider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast(max_retries: usize) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_delays(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let attempts = AtomicUsize::new(0);
        let result = fast(3)
            .run("embed", || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::RateLimited {
                        provider: Provider::Embedding,
                    })
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicUsize::new(0);
        let result: ProviderResult<()> = fast(2)
            .run("embed", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Timeout {
                    provider: Provider::Embedding,
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_rejected() {
        let attempts = AtomicUsize::new(0);
        let result: ProviderResult<()> = fast(5)
            .run("generate", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Rejected {
                    provider: Provider::Generation,
                    message: "invalid api key".to_string(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_delays_keeps_max_above_min() {
        let policy = RetryPolicy::new(1)
            .with_delays(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(2));
    }
}
