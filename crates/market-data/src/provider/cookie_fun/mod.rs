//! Cookie.fun token data provider implementation.
//!
//! Cookie.fun tracks attention and on-chain activity for Solana and Base
//! tokens. Market and on-chain metrics come from the same `/market`
//! payload; social metrics and token metadata have their own endpoints.
//! Price history is not exposed, so technical indicators are not served.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ProviderError;
use crate::models::{
    MarketData, OnChainMetrics, Operation, ProviderResult, SocialMetrics, TechnicalIndicators,
    TokenInfo,
};
use crate::provider::http::ProviderHttp;
use crate::provider::{ProviderCapabilities, RateLimit, TokenDataProvider};

const BASE_URL: &str = "https://api.cookie.fun";
const PROVIDER_ID: &str = "COOKIE_FUN";

const OPERATIONS: &[Operation] = &[
    Operation::Market,
    Operation::OnChain,
    Operation::Social,
    Operation::TokenInfo,
];

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /v1/tokens/{symbol}/market
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenMarketResponse {
    price: Option<f64>,
    market_cap: Option<f64>,
    #[serde(rename = "volume24h")]
    volume_24h: Option<f64>,
    #[serde(rename = "priceChange24h")]
    price_change_24h: Option<f64>,
    #[serde(rename = "high24h")]
    high_24h: Option<f64>,
    #[serde(rename = "low24h")]
    low_24h: Option<f64>,
    liquidity: Option<f64>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    holders: Option<u64>,
    #[serde(rename = "transactions24h")]
    transactions_24h: Option<u64>,
    #[serde(rename = "activeAddresses24h")]
    active_addresses_24h: Option<u64>,
    chain: Option<String>,
    contract_address: Option<String>,
}

/// Response from /v1/tokens/{symbol}/social
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenSocialResponse {
    followers_count: Option<u64>,
    reddit_subscribers: Option<u64>,
    telegram_members: Option<u64>,
    #[serde(rename = "mentions24h")]
    mentions_24h: Option<u64>,
    /// Fraction of positive mentions, `0.0..=1.0`.
    sentiment: Option<f64>,
}

/// Response from /v1/tokens/{symbol}/info
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfoResponse {
    name: Option<String>,
    symbol: Option<String>,
    description: Option<String>,
    website: Option<String>,
    chain: Option<String>,
    contract_address: Option<String>,
    total_supply: Option<f64>,
    decimals: Option<u8>,
    #[serde(default)]
    categories: Vec<String>,
    /// Platform name to profile URL; null entries are dropped.
    #[serde(default)]
    social: BTreeMap<String, Option<String>>,
}

// ============================================================================
// CookieFunProvider
// ============================================================================

/// Cookie.fun token data provider. Requires an API key.
pub struct CookieFunProvider {
    http: ProviderHttp,
    base_url: String,
    api_key: String,
}

impl CookieFunProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            http: ProviderHttp::new(PROVIDER_ID),
            base_url: BASE_URL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Make a GET request for one token resource.
    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        symbol: &str,
        resource: &str,
    ) -> ProviderResult<T> {
        let endpoint = format!(
            "/v1/tokens/{}/{}",
            urlencoding::encode(symbol.trim()),
            resource
        );
        let url = format!("{}{}", self.base_url, endpoint);

        let request = self
            .http
            .client()
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json");

        self.http.get_json(&endpoint, request).await
    }
}

// ============================================================================
// TokenDataProvider Implementation
// ============================================================================

#[async_trait]
impl TokenDataProvider for CookieFunProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            operations: OPERATIONS,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 60,
        }
    }

    async fn get_market_data(&self, symbol: &str) -> ProviderResult<MarketData> {
        debug!("Fetching market data for {} from Cookie.fun", symbol);
        let response: TokenMarketResponse = self.fetch(symbol, "market").await?;
        normalize_market(response)
    }

    async fn get_on_chain_metrics(&self, symbol: &str) -> ProviderResult<OnChainMetrics> {
        debug!("Fetching on-chain metrics for {} from Cookie.fun", symbol);
        let response: TokenMarketResponse = self.fetch(symbol, "market").await?;
        normalize_on_chain(response)
    }

    async fn get_technical_indicators(
        &self,
        _symbol: &str,
    ) -> ProviderResult<TechnicalIndicators> {
        Err(self.not_supported(Operation::Technical))
    }

    async fn get_social_metrics(&self, symbol: &str) -> ProviderResult<SocialMetrics> {
        debug!("Fetching social metrics for {} from Cookie.fun", symbol);
        let response: TokenSocialResponse = self.fetch(symbol, "social").await?;
        Ok(normalize_social(response))
    }

    async fn get_token_info(&self, symbol: &str) -> ProviderResult<TokenInfo> {
        debug!("Fetching token info for {} from Cookie.fun", symbol);
        let response: TokenInfoResponse = self.fetch(symbol, "info").await?;
        normalize_token_info(response)
    }
}

// ============================================================================
// Normalization
// ============================================================================

fn missing(field: &str) -> ProviderError {
    ProviderError::MissingField {
        provider: PROVIDER_ID.to_string(),
        field: field.to_string(),
    }
}

fn normalize_market(response: TokenMarketResponse) -> ProviderResult<MarketData> {
    let price = response.price.ok_or_else(|| missing("price"))?;

    Ok(MarketData {
        price,
        market_cap: response.market_cap.unwrap_or_default(),
        volume_24h: response.volume_24h.unwrap_or_default(),
        price_change_24h: response.price_change_24h.unwrap_or_default(),
        high_24h: response.high_24h.unwrap_or_default(),
        low_24h: response.low_24h.unwrap_or_default(),
        liquidity: response.liquidity.unwrap_or_default(),
        circulating_supply: response.circulating_supply.unwrap_or_default(),
    })
}

fn normalize_on_chain(response: TokenMarketResponse) -> ProviderResult<OnChainMetrics> {
    let holders = response.holders.ok_or_else(|| missing("holders"))?;

    Ok(OnChainMetrics {
        holders,
        liquidity: response.liquidity.unwrap_or_default(),
        total_supply: response.total_supply.unwrap_or_default(),
        transactions_24h: response.transactions_24h.unwrap_or_default(),
        active_addresses_24h: response.active_addresses_24h.unwrap_or_default(),
        chain: response.chain.unwrap_or_default(),
        contract_address: response.contract_address.unwrap_or_default(),
    })
}

fn normalize_social(response: TokenSocialResponse) -> SocialMetrics {
    SocialMetrics {
        twitter_followers: response.followers_count.unwrap_or_default(),
        reddit_subscribers: response.reddit_subscribers.unwrap_or_default(),
        telegram_members: response.telegram_members.unwrap_or_default(),
        mentions_24h: response.mentions_24h.unwrap_or_default(),
        sentiment_score: (response.sentiment.unwrap_or_default() * 100.0).clamp(0.0, 100.0),
    }
}

fn normalize_token_info(response: TokenInfoResponse) -> ProviderResult<TokenInfo> {
    let name = response.name.ok_or_else(|| missing("name"))?;

    let social_links = response
        .social
        .into_iter()
        .filter_map(|(platform, url)| url.filter(|u| !u.is_empty()).map(|u| (platform, u)))
        .collect();

    Ok(TokenInfo {
        name,
        symbol: response.symbol.unwrap_or_default().to_uppercase(),
        description: response.description.unwrap_or_default(),
        homepage: response.website.unwrap_or_default(),
        repositories: Vec::new(),
        categories: response.categories,
        // Cookie.fun does not rank by market cap
        market_cap_rank: 0,
        chain: response.chain.unwrap_or_default(),
        contract_address: response.contract_address.unwrap_or_default(),
        total_supply: response.total_supply.unwrap_or_default(),
        decimals: response.decimals.unwrap_or_default(),
        social_links,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MARKET_JSON: &str = r#"{
        "price": 0.0000231,
        "marketCap": 1530000000,
        "volume24h": 210000000,
        "priceChange24h": -3.2,
        "liquidity": 18500000,
        "totalSupply": 88000000000000,
        "holders": 812345,
        "transactions24h": 40211,
        "activeAddresses24h": 9021,
        "chain": "solana",
        "contractAddress": "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"
    }"#;

    #[test]
    fn test_provider_id_and_capabilities() {
        let provider = CookieFunProvider::new("key".to_string());
        assert_eq!(provider.id(), "COOKIE_FUN");
        assert!(provider.capabilities().supports(Operation::OnChain));
        assert!(provider.capabilities().supports(Operation::TokenInfo));
        assert!(!provider.capabilities().supports(Operation::Technical));
    }

    #[tokio::test]
    async fn test_technical_is_not_supported() {
        let provider = CookieFunProvider::new("key".to_string());
        let err = provider.get_technical_indicators("BONK").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotSupported { ref operation, .. } if operation == "technical"));
    }

    #[test]
    fn test_market_normalization() {
        let response: TokenMarketResponse = serde_json::from_str(MARKET_JSON).unwrap();
        let market = normalize_market(response).unwrap();
        assert_eq!(market.price, 0.0000231);
        assert_eq!(market.market_cap, 1530000000.0);
        assert_eq!(market.volume_24h, 210000000.0);
        assert_eq!(market.price_change_24h, -3.2);
        assert_eq!(market.liquidity, 18500000.0);
        assert_eq!(market.high_24h, 0.0);
    }

    #[test]
    fn test_market_requires_price() {
        let response: TokenMarketResponse =
            serde_json::from_str(r#"{"marketCap": 1000, "holders": 3}"#).unwrap();
        assert_eq!(normalize_market(response).unwrap_err(), missing("price"));
    }

    #[test]
    fn test_on_chain_normalization() {
        let response: TokenMarketResponse = serde_json::from_str(MARKET_JSON).unwrap();
        let on_chain = normalize_on_chain(response).unwrap();
        assert_eq!(on_chain.holders, 812345);
        assert_eq!(on_chain.transactions_24h, 40211);
        assert_eq!(on_chain.active_addresses_24h, 9021);
        assert_eq!(on_chain.chain, "solana");
        assert_eq!(on_chain.total_supply, 88000000000000.0);
    }

    #[test]
    fn test_on_chain_requires_holders() {
        let response: TokenMarketResponse = serde_json::from_str(r#"{"price": 1.0}"#).unwrap();
        assert_eq!(normalize_on_chain(response).unwrap_err(), missing("holders"));
    }

    #[test]
    fn test_social_sentiment_is_scaled_and_clamped() {
        let response: TokenSocialResponse = serde_json::from_str(
            r#"{"followersCount": 120000, "mentions24h": 5400, "sentiment": 0.62}"#,
        )
        .unwrap();
        let social = normalize_social(response);
        assert_eq!(social.twitter_followers, 120000);
        assert_eq!(social.mentions_24h, 5400);
        assert!((social.sentiment_score - 62.0).abs() < 1e-9);
        assert_eq!(social.telegram_members, 0);

        let response: TokenSocialResponse =
            serde_json::from_str(r#"{"sentiment": 1.7}"#).unwrap();
        assert_eq!(normalize_social(response).sentiment_score, 100.0);
    }

    #[test]
    fn test_token_info_normalization() {
        let json = r#"{
            "name": "Bonk",
            "symbol": "bonk",
            "chain": "solana",
            "contractAddress": "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
            "totalSupply": 88000000000000,
            "decimals": 5,
            "website": "https://bonkcoin.com",
            "social": {"twitter": "https://x.com/bonk_inu", "discord": null, "telegram": ""}
        }"#;
        let response: TokenInfoResponse = serde_json::from_str(json).unwrap();
        let info = normalize_token_info(response).unwrap();
        assert_eq!(info.name, "Bonk");
        assert_eq!(info.symbol, "BONK");
        assert_eq!(info.decimals, 5);
        assert_eq!(info.homepage, "https://bonkcoin.com");
        assert_eq!(info.social_links.len(), 1);
        assert_eq!(info.social_links["twitter"], "https://x.com/bonk_inu");
    }

    #[test]
    fn test_token_info_requires_name() {
        let response: TokenInfoResponse = serde_json::from_str(r#"{"symbol": "X"}"#).unwrap();
        assert_eq!(normalize_token_info(response).unwrap_err(), missing("name"));
    }
}
