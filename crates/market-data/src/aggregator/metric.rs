//! Binds each canonical record to the adapter operation that produces it.

use futures::future::BoxFuture;

use crate::models::{
    AggregateResult, MarketData, OnChainMetrics, Operation, ProviderResult, SocialMetrics,
    TechnicalIndicators, TokenInfo,
};
use crate::provider::TokenDataProvider;

/// Cached aggregate for any operation. One cache serves every metric type.
#[derive(Clone, Debug, PartialEq)]
pub enum CachedResult {
    Market(AggregateResult<MarketData>),
    OnChain(AggregateResult<OnChainMetrics>),
    Technical(AggregateResult<TechnicalIndicators>),
    Social(AggregateResult<SocialMetrics>),
    TokenInfo(AggregateResult<TokenInfo>),
}

/// A record type the aggregator can fetch, merge and cache.
pub trait Metric: Clone + Default + Send + Sync + 'static {
    const OPERATION: Operation;

    /// Invoke the matching adapter operation.
    fn call<'a>(
        provider: &'a dyn TokenDataProvider,
        symbol: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Self>>;

    /// Combine weighted samples into one record.
    ///
    /// `samples` is non-empty, every weight is positive, and the first
    /// sample belongs to the highest-priority provider.
    fn blend(samples: &[(f64, &Self)]) -> Self;

    fn into_cached(result: AggregateResult<Self>) -> CachedResult;

    fn from_cached(cached: CachedResult) -> Option<AggregateResult<Self>>;
}

/// Weighted mean over the samples of one field, skipping zero samples.
///
/// Adapters report an absent field as zero, so a zero is "no data" rather
/// than a measurement. Returns zero when no sample carries data.
pub fn weighted_mean<T>(samples: &[(f64, &T)], field: impl Fn(&T) -> f64) -> f64 {
    let (sum, weight) = samples
        .iter()
        .map(|(w, record)| (*w, field(record)))
        .filter(|(_, value)| *value != 0.0 && value.is_finite())
        .fold((0.0, 0.0), |(sum, total), (w, value)| {
            (sum + w * value, total + w)
        });

    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

fn weighted_count<T>(samples: &[(f64, &T)], field: impl Fn(&T) -> u64) -> u64 {
    weighted_mean(samples, |record| field(record) as f64).round() as u64
}

fn first<T: Clone + Default>(samples: &[(f64, &T)]) -> T {
    samples
        .first()
        .map(|(_, record)| (*record).clone())
        .unwrap_or_default()
}

impl Metric for MarketData {
    const OPERATION: Operation = Operation::Market;

    fn call<'a>(
        provider: &'a dyn TokenDataProvider,
        symbol: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Self>> {
        provider.get_market_data(symbol)
    }

    fn blend(samples: &[(f64, &Self)]) -> Self {
        Self {
            price: weighted_mean(samples, |m| m.price),
            market_cap: weighted_mean(samples, |m| m.market_cap),
            volume_24h: weighted_mean(samples, |m| m.volume_24h),
            price_change_24h: weighted_mean(samples, |m| m.price_change_24h),
            high_24h: weighted_mean(samples, |m| m.high_24h),
            low_24h: weighted_mean(samples, |m| m.low_24h),
            liquidity: weighted_mean(samples, |m| m.liquidity),
            circulating_supply: weighted_mean(samples, |m| m.circulating_supply),
        }
    }

    fn into_cached(result: AggregateResult<Self>) -> CachedResult {
        CachedResult::Market(result)
    }

    fn from_cached(cached: CachedResult) -> Option<AggregateResult<Self>> {
        match cached {
            CachedResult::Market(result) => Some(result),
            _ => None,
        }
    }
}

impl Metric for OnChainMetrics {
    const OPERATION: Operation = Operation::OnChain;

    fn call<'a>(
        provider: &'a dyn TokenDataProvider,
        symbol: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Self>> {
        provider.get_on_chain_metrics(symbol)
    }

    fn blend(samples: &[(f64, &Self)]) -> Self {
        let lead = first(samples);
        Self {
            holders: weighted_count(samples, |m| m.holders),
            liquidity: weighted_mean(samples, |m| m.liquidity),
            total_supply: weighted_mean(samples, |m| m.total_supply),
            transactions_24h: weighted_count(samples, |m| m.transactions_24h),
            active_addresses_24h: weighted_count(samples, |m| m.active_addresses_24h),
            chain: lead.chain,
            contract_address: lead.contract_address,
        }
    }

    fn into_cached(result: AggregateResult<Self>) -> CachedResult {
        CachedResult::OnChain(result)
    }

    fn from_cached(cached: CachedResult) -> Option<AggregateResult<Self>> {
        match cached {
            CachedResult::OnChain(result) => Some(result),
            _ => None,
        }
    }
}

impl Metric for TechnicalIndicators {
    const OPERATION: Operation = Operation::Technical;

    fn call<'a>(
        provider: &'a dyn TokenDataProvider,
        symbol: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Self>> {
        provider.get_technical_indicators(symbol)
    }

    fn blend(samples: &[(f64, &Self)]) -> Self {
        Self {
            rsi: weighted_mean(samples, |t| t.rsi).clamp(0.0, 100.0),
            macd: weighted_mean(samples, |t| t.macd),
            macd_signal: weighted_mean(samples, |t| t.macd_signal),
            macd_histogram: weighted_mean(samples, |t| t.macd_histogram),
            ema_short: weighted_mean(samples, |t| t.ema_short),
            ema_long: weighted_mean(samples, |t| t.ema_long),
            sma: weighted_mean(samples, |t| t.sma),
            bollinger_upper: weighted_mean(samples, |t| t.bollinger_upper),
            bollinger_middle: weighted_mean(samples, |t| t.bollinger_middle),
            bollinger_lower: weighted_mean(samples, |t| t.bollinger_lower),
            obv: weighted_mean(samples, |t| t.obv),
            vwap: weighted_mean(samples, |t| t.vwap),
        }
    }

    fn into_cached(result: AggregateResult<Self>) -> CachedResult {
        CachedResult::Technical(result)
    }

    fn from_cached(cached: CachedResult) -> Option<AggregateResult<Self>> {
        match cached {
            CachedResult::Technical(result) => Some(result),
            _ => None,
        }
    }
}

impl Metric for SocialMetrics {
    const OPERATION: Operation = Operation::Social;

    fn call<'a>(
        provider: &'a dyn TokenDataProvider,
        symbol: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Self>> {
        provider.get_social_metrics(symbol)
    }

    fn blend(samples: &[(f64, &Self)]) -> Self {
        Self {
            twitter_followers: weighted_count(samples, |s| s.twitter_followers),
            reddit_subscribers: weighted_count(samples, |s| s.reddit_subscribers),
            telegram_members: weighted_count(samples, |s| s.telegram_members),
            mentions_24h: weighted_count(samples, |s| s.mentions_24h),
            sentiment_score: weighted_mean(samples, |s| s.sentiment_score).clamp(0.0, 100.0),
        }
    }

    fn into_cached(result: AggregateResult<Self>) -> CachedResult {
        CachedResult::Social(result)
    }

    fn from_cached(cached: CachedResult) -> Option<AggregateResult<Self>> {
        match cached {
            CachedResult::Social(result) => Some(result),
            _ => None,
        }
    }
}

impl Metric for TokenInfo {
    const OPERATION: Operation = Operation::TokenInfo;

    fn call<'a>(
        provider: &'a dyn TokenDataProvider,
        symbol: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Self>> {
        provider.get_token_info(symbol)
    }

    /// Descriptive metadata is taken from the highest-priority provider;
    /// only supply is averaged.
    fn blend(samples: &[(f64, &Self)]) -> Self {
        Self {
            total_supply: weighted_mean(samples, |i| i.total_supply),
            ..first(samples)
        }
    }

    fn into_cached(result: AggregateResult<Self>) -> CachedResult {
        CachedResult::TokenInfo(result)
    }

    fn from_cached(cached: CachedResult) -> Option<AggregateResult<Self>> {
        match cached {
            CachedResult::TokenInfo(result) => Some(result),
            _ => None,
        }
    }
}
