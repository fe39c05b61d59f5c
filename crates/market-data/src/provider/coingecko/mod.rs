//! CoinGecko token data provider implementation.
//!
//! This module provides token data from the CoinGecko API v3:
//! - Spot market data via `/coins/markets`
//! - Technical indicators computed over `/coins/{id}/market_chart`
//! - Community metrics and token metadata via `/coins/{id}`
//!
//! CoinGecko has no on-chain holder or transaction data, so that operation
//! is not advertised. API documentation: https://docs.coingecko.com/reference/introduction

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ProviderError;
use crate::indicators::{IndicatorStrategy, PriceSeries, StandardIndicators};
use crate::models::{
    MarketData, OnChainMetrics, Operation, ProviderResult, SocialMetrics, TechnicalIndicators,
    TokenInfo,
};
use crate::provider::http::ProviderHttp;
use crate::provider::{ProviderCapabilities, RateLimit, TokenDataProvider};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";
const PROVIDER_ID: &str = "COINGECKO";

/// Days of daily history fed to the indicator strategy.
const DEFAULT_CHART_DAYS: u32 = 90;

const OPERATIONS: &[Operation] = &[
    Operation::Market,
    Operation::Technical,
    Operation::Social,
    Operation::TokenInfo,
];

/// Tickers whose CoinGecko coin id is not simply the lowercase ticker.
const COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("USDT", "tether"),
    ("USDC", "usd-coin"),
    ("BNB", "binancecoin"),
    ("XRP", "ripple"),
    ("ADA", "cardano"),
    ("DOGE", "dogecoin"),
    ("AVAX", "avalanche-2"),
    ("DOT", "polkadot"),
    ("LINK", "chainlink"),
    ("MATIC", "matic-network"),
    ("POL", "polygon-ecosystem-token"),
    ("TRX", "tron"),
    ("LTC", "litecoin"),
    ("ARB", "arbitrum"),
    ("OP", "optimism"),
];

// ============================================================================
// API Response Structures
// ============================================================================

/// Item of the /coins/markets array
#[derive(Debug, Deserialize)]
struct MarketsItem {
    current_price: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    circulating_supply: Option<f64>,
}

/// Response from /coins/{id}/market_chart: `[timestamp_ms, value]` pairs
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    #[serde(default)]
    prices: Vec<[f64; 2]>,
    #[serde(default)]
    total_volumes: Vec<[f64; 2]>,
}

/// Response from /coins/{id}
#[derive(Debug, Deserialize)]
struct CoinDetailResponse {
    name: Option<String>,
    symbol: Option<String>,
    #[serde(default)]
    description: HashMap<String, Option<String>>,
    links: Option<CoinLinks>,
    /// CoinGecko occasionally returns `null` entries in this list.
    #[serde(default)]
    categories: Vec<Option<String>>,
    market_cap_rank: Option<u32>,
    asset_platform_id: Option<String>,
    #[serde(default)]
    platforms: HashMap<String, Option<String>>,
    community_data: Option<CommunityData>,
    sentiment_votes_up_percentage: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinLinks {
    #[serde(default)]
    homepage: Vec<String>,
    repos_url: Option<ReposUrl>,
    twitter_screen_name: Option<String>,
    subreddit_url: Option<String>,
    telegram_channel_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReposUrl {
    #[serde(default)]
    github: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CommunityData {
    twitter_followers: Option<u64>,
    reddit_subscribers: Option<u64>,
    telegram_channel_user_count: Option<u64>,
}

// ============================================================================
// CoinGeckoProvider
// ============================================================================

/// CoinGecko API plan, which decides the host and key header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiPlan {
    Demo,
    Pro,
}

/// CoinGecko token data provider.
///
/// Works without an API key on the public tier; a demo or pro key raises
/// the request budget.
pub struct CoinGeckoProvider {
    http: ProviderHttp,
    base_url: String,
    api_key: Option<String>,
    plan: ApiPlan,
    chart_days: u32,
    indicators: Arc<dyn IndicatorStrategy>,
}

impl CoinGeckoProvider {
    /// Create a provider on the public/demo host.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: ProviderHttp::new(PROVIDER_ID),
            base_url: BASE_URL.to_string(),
            api_key,
            plan: ApiPlan::Demo,
            chart_days: DEFAULT_CHART_DAYS,
            indicators: Arc::new(StandardIndicators::default()),
        }
    }

    /// Create a provider on the pro host with a pro key.
    pub fn pro(api_key: String) -> Self {
        Self {
            base_url: PRO_BASE_URL.to_string(),
            plan: ApiPlan::Pro,
            ..Self::new(Some(api_key))
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_indicators(mut self, strategy: Arc<dyn IndicatorStrategy>) -> Self {
        self.indicators = strategy;
        self
    }

    pub fn with_chart_days(mut self, days: u32) -> Self {
        self.chart_days = days.max(1);
        self
    }

    /// Map a ticker to a CoinGecko coin id.
    fn coin_id(symbol: &str) -> String {
        let upper = symbol.trim().to_uppercase();
        COIN_IDS
            .iter()
            .find(|(ticker, _)| *ticker == upper)
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| symbol.trim().to_lowercase())
    }

    fn key_header(&self) -> &'static str {
        match self.plan {
            ApiPlan::Demo => "x-cg-demo-api-key",
            ApiPlan::Pro => "x-cg-pro-api-key",
        }
    }

    /// Make a GET request to the CoinGecko API.
    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> ProviderResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self
            .http
            .client()
            .get(&url)
            .header("accept", "application/json")
            .query(params);

        if let Some(key) = &self.api_key {
            request = request.header(self.key_header(), key);
        }

        self.http.get_json(endpoint, request).await
    }

    async fn fetch_detail(&self, id: &str, community: bool) -> ProviderResult<CoinDetailResponse> {
        let endpoint = format!("/coins/{}", urlencoding::encode(id));
        self.fetch(
            &endpoint,
            &[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "false"),
                ("community_data", if community { "true" } else { "false" }),
                ("developer_data", "false"),
            ],
        )
        .await
    }
}

// ============================================================================
// TokenDataProvider Implementation
// ============================================================================

#[async_trait]
impl TokenDataProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            operations: OPERATIONS,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        match (self.plan, self.api_key.is_some()) {
            (ApiPlan::Pro, _) => RateLimit {
                requests_per_minute: 500,
            },
            (ApiPlan::Demo, true) => RateLimit {
                requests_per_minute: 30,
            },
            // Keyless public tier
            (ApiPlan::Demo, false) => RateLimit {
                requests_per_minute: 10,
            },
        }
    }

    async fn get_market_data(&self, symbol: &str) -> ProviderResult<MarketData> {
        let id = Self::coin_id(symbol);
        debug!("Fetching market data for {} ({}) from CoinGecko", symbol, id);

        let items: Vec<MarketsItem> = self
            .fetch("/coins/markets", &[("vs_currency", "usd"), ("ids", id.as_str())])
            .await?;

        normalize_market(items, symbol)
    }

    async fn get_on_chain_metrics(&self, _symbol: &str) -> ProviderResult<OnChainMetrics> {
        Err(self.not_supported(Operation::OnChain))
    }

    async fn get_technical_indicators(&self, symbol: &str) -> ProviderResult<TechnicalIndicators> {
        let id = Self::coin_id(symbol);
        let days = self.chart_days.to_string();
        debug!(
            "Fetching {} days of price history for {} from CoinGecko",
            days, symbol
        );

        let endpoint = format!("/coins/{}/market_chart", urlencoding::encode(&id));
        let chart: MarketChartResponse = self
            .fetch(
                &endpoint,
                &[("vs_currency", "usd"), ("days", days.as_str()), ("interval", "daily")],
            )
            .await?;

        let series = price_series(chart)?;
        Ok(self.indicators.score(&series))
    }

    async fn get_social_metrics(&self, symbol: &str) -> ProviderResult<SocialMetrics> {
        let id = Self::coin_id(symbol);
        debug!("Fetching community data for {} from CoinGecko", symbol);

        let detail = self.fetch_detail(&id, true).await?;
        normalize_social(detail)
    }

    async fn get_token_info(&self, symbol: &str) -> ProviderResult<TokenInfo> {
        let id = Self::coin_id(symbol);
        debug!("Fetching token info for {} from CoinGecko", symbol);

        let detail = self.fetch_detail(&id, false).await?;
        normalize_token_info(detail)
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

fn normalize_market(items: Vec<MarketsItem>, symbol: &str) -> ProviderResult<MarketData> {
    let item = items
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::SymbolNotFound {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        })?;

    let price = item.current_price.ok_or_else(|| missing("current_price"))?;

    Ok(MarketData {
        price,
        market_cap: item.market_cap.unwrap_or_default(),
        volume_24h: item.total_volume.unwrap_or_default(),
        price_change_24h: item.price_change_percentage_24h.unwrap_or_default(),
        high_24h: item.high_24h.unwrap_or_default(),
        low_24h: item.low_24h.unwrap_or_default(),
        // Not reported by CoinGecko
        liquidity: 0.0,
        circulating_supply: item.circulating_supply.unwrap_or_default(),
    })
}

fn price_series(chart: MarketChartResponse) -> ProviderResult<PriceSeries> {
    if chart.prices.is_empty() {
        return Err(missing("prices"));
    }

    let mut prices = chart.prices;
    prices.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let mut volumes = chart.total_volumes;
    volumes.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let volumes = if volumes.len() == prices.len() {
        volumes.into_iter().map(|[_, v]| v).collect()
    } else {
        Vec::new()
    };

    Ok(PriceSeries::new(
        prices.into_iter().map(|[_, p]| p).collect(),
        volumes,
    ))
}

fn normalize_social(detail: CoinDetailResponse) -> ProviderResult<SocialMetrics> {
    let community = detail
        .community_data
        .ok_or_else(|| missing("community_data"))?;

    Ok(SocialMetrics {
        twitter_followers: community.twitter_followers.unwrap_or_default(),
        reddit_subscribers: community.reddit_subscribers.unwrap_or_default(),
        telegram_members: community.telegram_channel_user_count.unwrap_or_default(),
        // Not reported by CoinGecko
        mentions_24h: 0,
        sentiment_score: detail
            .sentiment_votes_up_percentage
            .unwrap_or_default()
            .clamp(0.0, 100.0),
    })
}

fn normalize_token_info(detail: CoinDetailResponse) -> ProviderResult<TokenInfo> {
    let name = detail.name.ok_or_else(|| missing("name"))?;
    let links = detail.links.unwrap_or_default();

    let chain = detail.asset_platform_id.unwrap_or_default();
    let contract_address = detail
        .platforms
        .get(&chain)
        .cloned()
        .flatten()
        .unwrap_or_default();

    let mut social_links = BTreeMap::new();
    if let Some(handle) = links.twitter_screen_name.filter(|h| !h.is_empty()) {
        social_links.insert("twitter".to_string(), format!("https://twitter.com/{}", handle));
    }
    if let Some(url) = links.subreddit_url.filter(|u| !u.is_empty()) {
        social_links.insert("reddit".to_string(), url);
    }
    if let Some(handle) = links.telegram_channel_identifier.filter(|h| !h.is_empty()) {
        social_links.insert("telegram".to_string(), format!("https://t.me/{}", handle));
    }

    Ok(TokenInfo {
        name,
        symbol: detail.symbol.unwrap_or_default().to_uppercase(),
        description: detail
            .description
            .get("en")
            .cloned()
            .flatten()
            .unwrap_or_default(),
        homepage: links
            .homepage
            .into_iter()
            .find(|url| !url.is_empty())
            .unwrap_or_default(),
        repositories: links
            .repos_url
            .map(|repos| repos.github)
            .unwrap_or_default(),
        categories: detail.categories.into_iter().flatten().collect(),
        market_cap_rank: detail.market_cap_rank.unwrap_or_default(),
        chain,
        contract_address,
        // Supply and decimals are not part of /coins/{id} without market data
        total_supply: 0.0,
        decimals: 0,
        social_links,
    })
}

// ============================================================================
// Tests
// ============================================================================
