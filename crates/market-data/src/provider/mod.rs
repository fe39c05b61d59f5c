//! Token data provider abstractions and implementations.
//!
//! This module contains:
//! - The `TokenDataProvider` trait that all adapters implement
//! - Provider capabilities and rate limiting configuration
//! - Shared HTTP plumbing for REST adapters
//! - Concrete adapters (CoinGecko, Cookie.fun)
//!
//! Adapters only translate one upstream request into one normalized record.
//! Rate limiting, retries and timeouts are applied around them by the
//! aggregator, which never knows which concrete adapter it is calling.

mod capabilities;
mod traits;

pub mod coingecko;
pub mod cookie_fun;
pub mod http;

// Re-exports
pub use capabilities::{ProviderCapabilities, RateLimit};
pub use coingecko::CoinGeckoProvider;
pub use cookie_fun::CookieFunProvider;
pub use traits::TokenDataProvider;
