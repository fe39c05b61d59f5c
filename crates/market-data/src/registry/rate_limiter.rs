//! Minimum-interval rate limiter for a single provider.
//!
//! Each provider gets one limiter. Callers queue on a fair async mutex, so
//! they are released strictly in arrival order, and each holder sleeps out
//! whatever remains of `min_interval` since the previous dispatch before
//! stamping its own dispatch time.

use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes dispatches so no two are closer than `min_interval`.
#[derive(Debug)]
pub struct RateLimiter {
    provider: String,
    min_interval: Duration,
    /// Time of the previous dispatch. The mutex queue is the FIFO tail.
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(provider: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            provider: provider.into(),
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for this provider's next dispatch slot.
    ///
    /// Never fails; only delays. Returns the dispatch instant.
    pub async fn acquire(&self) -> Instant {
        let mut last = self.last_dispatch.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(
                    "Rate limiter: waiting {:?} for provider '{}'",
                    wait, self.provider
                );
                tokio::time::sleep(wait).await;
            }
        }

        let now = Instant::now();
        *last = Some(now);
        now
    }
}
