//! Token data provider trait definitions.
//!
//! This module defines the core `TokenDataProvider` trait that all
//! upstream adapters must implement.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::{
    MarketData, OnChainMetrics, Operation, ProviderResult, SocialMetrics, TechnicalIndicators,
    TokenInfo,
};

use super::capabilities::{ProviderCapabilities, RateLimit};

/// Trait for token data providers.
///
/// Implement this trait to add support for a new upstream source. Every
/// operation returns a shape-normalized record or a [`ProviderError`]
/// naming this provider. Rate limiting and retries are applied by the
/// aggregator around each call, so implementations perform exactly one
/// upstream request per invocation.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use coinsight_market_data::provider::{ProviderCapabilities, RateLimit, TokenDataProvider};
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl TokenDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn rate_limit(&self) -> RateLimit {
///         RateLimit { requests_per_minute: 30 }
///     }
///
///     // ... implement the four operations
/// }
/// ```
#[async_trait]
pub trait TokenDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "COINGECKO". Used for priority
    /// ordering, rate limiting, logging and error reports.
    fn id(&self) -> &'static str;

    /// Operations this provider serves. Defaults to the four core operations.
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    /// Declared request budget. Configuration may override it.
    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    async fn get_market_data(&self, symbol: &str) -> ProviderResult<MarketData>;

    async fn get_on_chain_metrics(&self, symbol: &str) -> ProviderResult<OnChainMetrics>;

    async fn get_technical_indicators(&self, symbol: &str)
        -> ProviderResult<TechnicalIndicators>;

    async fn get_social_metrics(&self, symbol: &str) -> ProviderResult<SocialMetrics>;

    /// Fetch descriptive token metadata.
    ///
    /// Default implementation returns `NotSupported`.
    async fn get_token_info(&self, symbol: &str) -> ProviderResult<TokenInfo> {
        let _ = symbol;
        Err(self.not_supported(Operation::TokenInfo))
    }

    /// Error for an operation this provider does not implement.
    fn not_supported(&self, operation: Operation) -> ProviderError {
        ProviderError::NotSupported {
            provider: self.id().to_string(),
            operation: operation.to_string(),
        }
    }
}
