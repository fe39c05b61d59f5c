//! Exponential backoff around one fallible provider call.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::errors::{ConfigurationError, ProviderError};

/// Retry bounds applied to every provider call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Hard cap on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_attempts == 0 {
            return Err(ConfigurationError::ZeroAttempts);
        }
        Ok(())
    }

    /// Delay after the failed attempt with zero-based index `attempt`:
    /// `min(base_delay * 2^attempt, max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Invoke `op` until it succeeds or `policy.max_attempts` invocations fail.
///
/// Attempts run strictly one after another with no jitter. On exhaustion
/// the last cause is wrapped in [`ProviderError::RetriesExhausted`]. An
/// error that is not [retryable](ProviderError::is_retryable) is returned
/// as is, without further attempts.
pub async fn with_retry<T, F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        "Provider '{}' succeeded on attempt {}/{}",
                        provider,
                        attempt + 1,
                        max_attempts
                    );
                }
                return Ok(value);
            }
            Err(error) if !error.is_retryable() => {
                debug!(
                    "Provider '{}' attempt {}/{} failed permanently: {}",
                    provider,
                    attempt + 1,
                    max_attempts,
                    error
                );
                return Err(error);
            }
            Err(error) => {
                if attempt + 1 >= max_attempts {
                    warn!(
                        "Provider '{}' failed after {} attempts: {}",
                        provider, max_attempts, error
                    );
                    return Err(ProviderError::RetriesExhausted {
                        provider: provider.to_string(),
                        attempts: max_attempts,
                        last: Box::new(error),
                    });
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    "Provider '{}' attempt {}/{} failed: {}, retrying in {:?}",
                    provider,
                    attempt + 1,
                    max_attempts,
                    error,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        }
    }

    fn failure() -> ProviderError {
        ProviderError::Http {
            provider: "TEST".to_string(),
            status: 503,
            message: "Service Unavailable".to_string(),
        }
    }

    #[test]
    fn test_delay_doubles_until_cap() {
        let policy = policy(10);
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert_eq!(policy(0).validate(), Err(ConfigurationError::ZeroAttempts));
        assert!(policy(1).validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_k_minus_one_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry("TEST", &policy(5), move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(failure())
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_wraps_last_cause() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry("TEST", &policy(4), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(failure())
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(ProviderError::RetriesExhausted {
                provider,
                attempts,
                last,
            }) => {
                assert_eq!(provider, "TEST");
                assert_eq!(attempts, 4);
                assert_eq!(*last, failure());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_errors_stop_immediately() {
        let start = Instant::now();
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry("TEST", &policy(3), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::SymbolNotFound {
                provider: "TEST".to_string(),
                symbol: "NOPE".to_string(),
            })
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("Symbol not found: NOPE".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_after_transient_ones_is_not_wrapped() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry("TEST", &policy(5), move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(failure())
            } else {
                Err(ProviderError::MissingField {
                    provider: "TEST".to_string(),
                    field: "price".to_string(),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(ProviderError::MissingField { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_are_sequential() {
        let start = Instant::now();
        let _: Result<(), _> = with_retry("TEST", &policy(4), || async { Err(failure()) }).await;
        // 100 + 200 + 350, no delay after the final attempt.
        assert_eq!(start.elapsed(), Duration::from_millis(650));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_does_not_sleep() {
        let start = Instant::now();
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry("TEST", &policy(1), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(failure())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
