//! Cache-first fan-out over every configured provider.
//!
//! The aggregator owns the result cache and one rate limiter per provider.
//! A fetch either answers from the cache or:
//! 1. Selects the providers whose capabilities cover the operation
//! 2. Calls each of them concurrently, every call gated by its provider's
//!    limiter and wrapped in the retry policy
//! 3. Settles all calls independently, so one failure never cancels another
//! 4. Merges the outcomes with the operation's strategy
//! 5. Caches the merged result, whatever its status
//!
//! Provider failures end up in the result's status and error list. Only
//! misconfiguration is an `Err`, and only from [`Aggregator::new`].

mod merge;
mod metric;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::{CacheConfig, TtlCache};
use crate::errors::{ConfigurationError, ProviderError};
use crate::models::{
    AggregateResult, AggregateStatus, MarketData, OnChainMetrics, ProviderResult, SocialMetrics,
    TechnicalIndicators, TokenComparison, TokenData, TokenInfo,
};
use crate::provider::TokenDataProvider;
use crate::registry::{with_retry, RateLimiter, RetryPolicy};

pub use merge::{merge, MergeConfig, MergeStrategy};
pub use metric::{weighted_mean, CachedResult, Metric};

/// Default ceiling on one provider's share of a fan-out.
const DEFAULT_FANOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the aggregator needs, supplied once at construction.
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    /// Per-provider minimum dispatch interval. Providers not listed use
    /// the interval derived from their declared [`RateLimit`](crate::provider::RateLimit).
    pub min_intervals: HashMap<String, Duration>,
    /// Provider ids, highest priority first. Unlisted providers follow in
    /// registration order.
    pub provider_priority: Vec<String>,
    pub merge: MergeConfig,
    /// Bound on each provider call including its retries and limiter waits.
    /// `None` disables the bound.
    pub fanout_timeout: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
            min_intervals: HashMap::new(),
            provider_priority: Vec::new(),
            merge: MergeConfig::default(),
            fanout_timeout: Some(DEFAULT_FANOUT_TIMEOUT),
        }
    }
}

/// Fan-out ceiling for one provider call, net of limiter queueing.
struct CallBudget {
    ceiling: Duration,
    started: Instant,
    queued_nanos: AtomicU64,
}

impl CallBudget {
    fn new(ceiling: Duration) -> Self {
        Self {
            ceiling,
            started: Instant::now(),
            queued_nanos: AtomicU64::new(0),
        }
    }

    fn exclude(&self, queued: Duration) {
        let nanos = u64::try_from(queued.as_nanos()).unwrap_or(u64::MAX);
        self.queued_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn remaining(&self) -> Duration {
        let queued = Duration::from_nanos(self.queued_nanos.load(Ordering::Relaxed));
        let spent = self.started.elapsed().saturating_sub(queued);
        self.ceiling.saturating_sub(spent)
    }
}

struct ProviderSlot {
    name: String,
    provider: Arc<dyn TokenDataProvider>,
    limiter: RateLimiter,
}

/// Fans requests out to token data providers and merges their answers.
pub struct Aggregator {
    slots: Vec<ProviderSlot>,
    cache: Arc<TtlCache<String, CachedResult>>,
    retry: RetryPolicy,
    merge: MergeConfig,
    fanout_timeout: Option<Duration>,
    sweeper: Option<JoinHandle<()>>,
}

/// Cache-key form of a symbol: trimmed and uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

impl Aggregator {
    /// Validate `config`, order `providers` by priority and build their limiters.
    ///
    /// When called inside a tokio runtime this also starts the cache sweeper,
    /// which stops when the aggregator is dropped.
    pub fn new(
        config: AggregatorConfig,
        providers: Vec<Arc<dyn TokenDataProvider>>,
    ) -> Result<Self, ConfigurationError> {
        if providers.is_empty() {
            return Err(ConfigurationError::NoProviders);
        }
        config.retry.validate()?;

        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.id()) {
                return Err(ConfigurationError::DuplicateProvider(
                    provider.id().to_string(),
                ));
            }
        }

        let cache = Arc::new(TtlCache::new(config.cache.clone())?);

        let mut providers = providers;
        let rank = |id: &str| {
            config
                .provider_priority
                .iter()
                .position(|p| p == id)
                .unwrap_or(usize::MAX)
        };
        // Stable: unlisted providers keep registration order.
        providers.sort_by_key(|p| rank(p.id()));

        let slots: Vec<ProviderSlot> = providers
            .into_iter()
            .map(|provider| {
                let name = provider.id().to_string();
                let interval = config
                    .min_intervals
                    .get(&name)
                    .copied()
                    .unwrap_or_else(|| provider.rate_limit().min_interval());
                ProviderSlot {
                    limiter: RateLimiter::new(name.clone(), interval),
                    name,
                    provider,
                }
            })
            .collect();

        let sweeper = tokio::runtime::Handle::try_current()
            .ok()
            .map(|_| cache.spawn_sweeper());

        info!(
            "Aggregator ready with providers [{}]",
            slots
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        for slot in &slots {
            debug!(
                "Provider '{}' min dispatch interval {:?}",
                slot.name,
                slot.limiter.min_interval()
            );
        }

        Ok(Self {
            slots,
            cache,
            retry: config.retry,
            merge: config.merge,
            fanout_timeout: config.fanout_timeout,
            sweeper,
        })
    }

    /// Provider ids in priority order.
    pub fn providers(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    /// Fetch one metric for `symbol`, answering from the cache when possible.
    pub async fn fetch<M: Metric>(&self, symbol: &str) -> AggregateResult<M> {
        let key = cache_key::<M>(symbol);

        if let Some(result) = self.cache.get(&key).and_then(M::from_cached) {
            debug!("Cache hit for {}", key);
            return result;
        }

        debug!("Cache miss for {}", key);
        self.fetch_and_store::<M>(symbol, key).await
    }

    /// Fetch one metric for `symbol` without reading the cache.
    ///
    /// The fresh result replaces whatever was cached for the key.
    pub async fn refresh<M: Metric>(&self, symbol: &str) -> AggregateResult<M> {
        let key = cache_key::<M>(symbol);
        debug!("Forced refresh for {}", key);
        self.fetch_and_store::<M>(symbol, key).await
    }

    async fn fetch_and_store<M: Metric>(&self, symbol: &str, key: String) -> AggregateResult<M> {
        let result = self.fan_out::<M>(symbol.trim()).await;
        self.cache.set(key, M::into_cached(result.clone()));
        result
    }

    async fn fan_out<M: Metric>(&self, symbol: &str) -> AggregateResult<M> {
        let operation = M::OPERATION;
        let capable: Vec<&ProviderSlot> = self
            .slots
            .iter()
            .filter(|slot| slot.provider.capabilities().supports(operation))
            .collect();

        if capable.is_empty() {
            warn!("No configured provider supports {}", operation);
            return AggregateResult::failed(vec![format!(
                "no configured provider supports {}",
                operation
            )]);
        }

        let calls = capable.iter().map(|slot| async move {
            let outcome = self.dispatch::<M>(slot, symbol).await;
            (slot.name.clone(), outcome)
        });
        let outcomes = join_all(calls).await;

        let result = merge(self.merge.strategy_for(operation), outcomes);
        match result.status {
            AggregateStatus::Success => info!(
                "Fetched {} for {} from [{}]",
                operation,
                symbol,
                join_names(&result.source_providers)
            ),
            AggregateStatus::Partial => warn!(
                "Fetched {} for {} with {} provider error(s): {}",
                operation,
                symbol,
                result.errors.len(),
                result.errors.join("; ")
            ),
            AggregateStatus::Error => warn!(
                "All providers failed {} for {}: {}",
                operation,
                symbol,
                result.errors.join("; ")
            ),
        }
        result
    }

    /// One provider call: limiter slot, adapter call, retries, timeout.
    ///
    /// The fan-out ceiling covers adapter calls and backoff sleeps. Time
    /// queued on the provider's limiter is not charged against it.
    async fn dispatch<M: Metric>(&self, slot: &ProviderSlot, symbol: &str) -> ProviderResult<M> {
        let Some(ceiling) = self.fanout_timeout else {
            return with_retry(&slot.name, &self.retry, move || async move {
                slot.limiter.acquire().await;
                M::call(slot.provider.as_ref(), symbol).await
            })
            .await;
        };

        let budget = CallBudget::new(ceiling);
        let budget = &budget;
        with_retry(&slot.name, &self.retry, move || async move {
            let queued_at = Instant::now();
            slot.limiter.acquire().await;
            budget.exclude(queued_at.elapsed());

            let call = M::call(slot.provider.as_ref(), symbol);
            match tokio::time::timeout(budget.remaining(), call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        "Provider '{}' did not answer {} within {:?}",
                        slot.name,
                        M::OPERATION,
                        ceiling
                    );
                    Err(ProviderError::Timeout {
                        provider: slot.name.clone(),
                        after: ceiling,
                    })
                }
            }
        })
        .await
    }

    /// Fetch all four core metrics for `symbol` concurrently.
    pub async fn fetch_token_data(&self, symbol: &str) -> TokenData {
        let (market, on_chain, technical, social) = tokio::join!(
            self.fetch::<MarketData>(symbol),
            self.fetch::<OnChainMetrics>(symbol),
            self.fetch::<TechnicalIndicators>(symbol),
            self.fetch::<SocialMetrics>(symbol),
        );

        let status = AggregateStatus::combine([
            market.status,
            on_chain.status,
            technical.status,
            social.status,
        ]);

        let errors: Vec<String> = [
            &market.errors,
            &on_chain.errors,
            &technical.errors,
            &social.errors,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

        TokenData {
            symbol: normalize_symbol(symbol),
            market: market.value,
            on_chain: on_chain.value,
            technical: technical.value,
            social: social.value,
            timestamp: Utc::now(),
            status,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }

    /// Descriptive metadata for `symbol` from providers that serve it.
    pub async fn token_info(&self, symbol: &str) -> AggregateResult<TokenInfo> {
        self.fetch::<TokenInfo>(symbol).await
    }

    /// Market snapshots for several symbols, fetched concurrently.
    ///
    /// Symbols that normalize to the same key are fetched once.
    pub async fn compare_tokens(&self, symbols: &[&str]) -> TokenComparison {
        let mut unique: Vec<String> = Vec::new();
        for symbol in symbols {
            let normalized = normalize_symbol(symbol);
            if !normalized.is_empty() && !unique.contains(&normalized) {
                unique.push(normalized);
            }
        }

        let results = join_all(unique.iter().map(|s| self.fetch::<MarketData>(s))).await;

        TokenComparison {
            timestamp: Utc::now(),
            tokens: unique.into_iter().zip(results).collect::<BTreeMap<_, _>>(),
        }
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("Cache cleared");
    }

    /// Number of cached results, including expired ones not yet swept.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

fn cache_key<M: Metric>(symbol: &str) -> String {
    format!("{}:{}", normalize_symbol(symbol), M::OPERATION)
}

fn join_names<'a, I: IntoIterator<Item = &'a String>>(names: I) -> String {
    names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
