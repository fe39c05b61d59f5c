//! Canonical, provider-normalized metric records.
//!
//! Adapters map their upstream payloads into these shapes. Optional upstream
//! fields default to zero or empty, never `None`, so merge arithmetic and
//! downstream formatting are total.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Spot market snapshot, USD denominated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    /// Percent change over the last 24 hours.
    pub price_change_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub liquidity: f64,
    pub circulating_supply: f64,
}

/// Chain-level activity for a token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainMetrics {
    pub holders: u64,
    pub liquidity: f64,
    pub total_supply: f64,
    pub transactions_24h: u64,
    pub active_addresses_24h: u64,
    pub chain: String,
    pub contract_address: String,
}

/// Output of an indicator strategy over a price series.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIndicators {
    /// Relative strength index, bounded to `[0, 100]`.
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    pub sma: f64,
    pub bollinger_upper: f64,
    pub bollinger_middle: f64,
    pub bollinger_lower: f64,
    pub obv: f64,
    pub vwap: f64,
}

/// Community and attention metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMetrics {
    pub twitter_followers: u64,
    pub reddit_subscribers: u64,
    pub telegram_members: u64,
    pub mentions_24h: u64,
    /// Share of positive sentiment, `[0, 100]`.
    pub sentiment_score: f64,
}

/// Descriptive metadata about a token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub homepage: String,
    pub repositories: Vec<String>,
    pub categories: Vec<String>,
    pub market_cap_rank: u32,
    pub chain: String,
    pub contract_address: String,
    pub total_supply: f64,
    pub decimals: u8,
    pub social_links: BTreeMap<String, String>,
}
