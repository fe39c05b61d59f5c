//! Provider capabilities and rate limiting configuration.
//!
//! This module defines structures for describing what a token data provider
//! can do and how it should be rate-limited.

use std::time::Duration;

use crate::models::Operation;

/// Describes the operations a provider can serve.
///
/// The aggregator only fans a request out to providers whose capabilities
/// include the requested operation.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    pub operations: &'static [Operation],
}

impl ProviderCapabilities {
    pub fn supports(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

impl Default for ProviderCapabilities {
    /// The four core operations.
    fn default() -> Self {
        Self {
            operations: &Operation::CORE,
        }
    }
}

/// Rate limiting configuration for a provider.
///
/// Controls how aggressively we can call a provider to avoid
/// hitting their rate limits and getting blocked.
#[derive(Clone, Debug)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,
}

impl RateLimit {
    /// Minimum spacing between two dispatches that honors the budget.
    pub fn min_interval(&self) -> Duration {
        if self.requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / self.requests_per_minute as f64)
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
        }
    }
}
