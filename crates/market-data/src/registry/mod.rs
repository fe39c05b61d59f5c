//! Per-provider call discipline.
//!
//! This module provides the two policies the aggregator wraps around every
//! adapter call:
//! - Minimum-interval rate limiting per provider
//! - Bounded exponential backoff retries

mod rate_limiter;
mod retry;

pub use rate_limiter::RateLimiter;
pub use retry::{with_retry, RetryPolicy};
