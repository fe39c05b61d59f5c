//! Coinsight Market Data Crate
//!
//! This crate aggregates crypto token data from several upstream providers
//! behind one cache-first API for the Coinsight assistant.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Four uniform metric families: market, on-chain, technical, social
//! - Optional token metadata for providers that serve it
//! - Multiple providers: CoinGecko, Cookie.fun, or any `TokenDataProvider`
//! - Per-provider rate limiting and exponential backoff retries
//! - A bounded TTL cache with insertion-order eviction
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |    Aggregator    |  fetch::<M>(symbol)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |     TtlCache     |  hit -> return cached AggregateResult
//! +------------------+
//!          | miss
//!          v
//! +------------------+     +------------------+
//! |  RateLimiter +   | --> | TokenDataProvider|  (one call per capable provider,
//! |   with_retry     |     +------------------+   all concurrent)
//! +------------------+              |
//!                                   v
//!                          +------------------+
//!                          |      merge       |  (strategy per operation)
//!                          +------------------+
//!                                   |
//!                                   v
//!                          +------------------+
//!                          | AggregateResult  |  (value, status, errors)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Aggregator`] - Cache-first fan-out over the configured providers
//! - [`AggregateResult`] - Merged value with status and per-provider errors
//! - [`TokenData`] - The four core metrics for one symbol
//! - [`TokenDataProvider`] - The adapter contract
//! - [`ProviderError`] - Failure of one adapter call

pub mod aggregator;
pub mod cache;
pub mod errors;
pub mod format;
pub mod indicators;
pub mod models;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{
    AggregateResult, AggregateStatus, MarketData, OnChainMetrics, Operation, ProviderResult,
    SocialMetrics, TechnicalIndicators, TokenComparison, TokenData, TokenInfo,
};

// Re-export aggregator types
pub use aggregator::{
    normalize_symbol, Aggregator, AggregatorConfig, MergeConfig, MergeStrategy, Metric,
};

pub use cache::{CacheConfig, TtlCache};
pub use errors::{ConfigurationError, ProviderError};
pub use format::format_market_context;
pub use indicators::{IndicatorStrategy, PriceSeries, StandardIndicators};

// Re-export provider types
pub use provider::coingecko::CoinGeckoProvider;
pub use provider::cookie_fun::CookieFunProvider;
pub use provider::{ProviderCapabilities, RateLimit, TokenDataProvider};

// Re-export registry types
pub use registry::{with_retry, RateLimiter, RetryPolicy};
