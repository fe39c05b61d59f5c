use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use coinsight_market_data::{
    AggregatorConfig, CacheConfig, CoinGeckoProvider, CookieFunProvider, RateLimit, RetryPolicy,
    TokenDataProvider,
};

/// CLI configuration read from `COINSIGHT_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub coingecko_api_key: Option<String>,
    pub coingecko_pro: bool,
    pub coingecko_base_url: Option<String>,
    pub cookie_fun_api_key: Option<String>,
    pub cookie_fun_base_url: Option<String>,
    pub cache_ttl: Option<Duration>,
    pub cache_max_size: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub fanout_timeout: Option<Duration>,
    pub provider_priority: Vec<String>,
    /// Price history window for CoinGecko indicators, in days.
    pub chart_days: Option<u32>,
    /// Per-provider request budget overrides, from `COINSIGHT_RATE_LIMIT_<ID>`.
    pub requests_per_minute: HashMap<String, u32>,
}

const PROVIDER_IDS: [&str; 2] = ["COINGECKO", "COOKIE_FUN"];

/// Cookie.fun answers first, CoinGecko fills the gaps.
const DEFAULT_PROVIDER_PRIORITY: [&str; 2] = ["COOKIE_FUN", "COINGECKO"];

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut requests_per_minute = HashMap::new();
        for id in PROVIDER_IDS {
            let key = format!("COINSIGHT_RATE_LIMIT_{}", id);
            if let Some(rpm) = parse::<u32>(&key, get(&key))? {
                requests_per_minute.insert(id.to_string(), rpm);
            }
        }

        Ok(Self {
            coingecko_api_key: get("COINSIGHT_COINGECKO_API_KEY"),
            coingecko_pro: get("COINSIGHT_COINGECKO_PLAN")
                .is_some_and(|plan| plan.eq_ignore_ascii_case("pro")),
            coingecko_base_url: get("COINSIGHT_COINGECKO_BASE_URL"),
            cookie_fun_api_key: get("COINSIGHT_COOKIE_FUN_API_KEY"),
            cookie_fun_base_url: get("COINSIGHT_COOKIE_FUN_BASE_URL"),
            cache_ttl: parse::<u64>("COINSIGHT_CACHE_TTL_SECS", get("COINSIGHT_CACHE_TTL_SECS"))?
                .map(Duration::from_secs),
            cache_max_size: parse("COINSIGHT_CACHE_MAX_SIZE", get("COINSIGHT_CACHE_MAX_SIZE"))?,
            retry_attempts: parse("COINSIGHT_RETRY_ATTEMPTS", get("COINSIGHT_RETRY_ATTEMPTS"))?,
            fanout_timeout: parse::<u64>(
                "COINSIGHT_FANOUT_TIMEOUT_SECS",
                get("COINSIGHT_FANOUT_TIMEOUT_SECS"),
            )?
            .map(Duration::from_secs),
            provider_priority: get("COINSIGHT_PROVIDER_PRIORITY")
                .map(|list| {
                    list.split(',')
                        .map(|id| id.trim().to_uppercase())
                        .filter(|id| !id.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| {
                    DEFAULT_PROVIDER_PRIORITY
                        .iter()
                        .map(|id| id.to_string())
                        .collect()
                }),
            chart_days: parse("COINSIGHT_CHART_DAYS", get("COINSIGHT_CHART_DAYS"))?,
            requests_per_minute,
        })
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        let defaults = AggregatorConfig::default();
        let cache = CacheConfig {
            ttl: self.cache_ttl.unwrap_or(defaults.cache.ttl),
            max_size: self.cache_max_size.unwrap_or(defaults.cache.max_size),
        };
        let retry = RetryPolicy {
            max_attempts: self.retry_attempts.unwrap_or(defaults.retry.max_attempts),
            ..defaults.retry.clone()
        };
        let min_intervals = self
            .requests_per_minute
            .iter()
            .filter(|(_, rpm)| **rpm > 0)
            .map(|(id, rpm)| {
                let limit = RateLimit {
                    requests_per_minute: *rpm,
                };
                (id.clone(), limit.min_interval())
            })
            .collect();

        AggregatorConfig {
            cache,
            retry,
            min_intervals,
            provider_priority: self.provider_priority.clone(),
            fanout_timeout: self.fanout_timeout.or(defaults.fanout_timeout),
            ..defaults
        }
    }

    /// CoinGecko is always available; Cookie.fun needs a key.
    pub fn providers(&self) -> Vec<Arc<dyn TokenDataProvider>> {
        let mut coingecko = match (&self.coingecko_api_key, self.coingecko_pro) {
            (Some(key), true) => CoinGeckoProvider::pro(key.clone()),
            (key, _) => CoinGeckoProvider::new(key.clone()),
        };
        if let Some(url) = &self.coingecko_base_url {
            coingecko = coingecko.with_base_url(url.clone());
        }
        if let Some(days) = self.chart_days {
            coingecko = coingecko.with_chart_days(days);
        }

        let mut providers: Vec<Arc<dyn TokenDataProvider>> = vec![Arc::new(coingecko)];

        if let Some(key) = &self.cookie_fun_api_key {
            let mut cookie_fun = CookieFunProvider::new(key.clone());
            if let Some(url) = &self.cookie_fun_base_url {
                cookie_fun = cookie_fun.with_base_url(url.clone());
            }
            providers.push(Arc::new(cookie_fun));
        }

        providers
    }
}

fn parse<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| {
            v.parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, v))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.coingecko_api_key, None);
        assert_eq!(config.chart_days, None);
        assert!(config.requests_per_minute.is_empty());
        assert_eq!(config.provider_priority, vec!["COOKIE_FUN", "COINGECKO"]);

        let aggregator = config.aggregator_config();
        assert_eq!(aggregator.cache.ttl, Duration::from_secs(300));
        assert_eq!(aggregator.cache.max_size, 1000);
        assert_eq!(aggregator.retry.max_attempts, 3);
        assert_eq!(aggregator.fanout_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.providers().len(), 1);
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("COINSIGHT_COOKIE_FUN_API_KEY", "secret"),
            ("COINSIGHT_CACHE_TTL_SECS", "60"),
            ("COINSIGHT_CACHE_MAX_SIZE", "100"),
            ("COINSIGHT_PROVIDER_PRIORITY", "cookie_fun, coingecko,"),
            ("COINSIGHT_RATE_LIMIT_COINGECKO", "30"),
            ("COINSIGHT_COINGECKO_API_KEY", "  "),
            ("COINSIGHT_CHART_DAYS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.coingecko_api_key, None);
        assert_eq!(config.provider_priority, vec!["COOKIE_FUN", "COINGECKO"]);
        assert_eq!(config.chart_days, Some(30));

        let aggregator = config.aggregator_config();
        assert_eq!(aggregator.cache.ttl, Duration::from_secs(60));
        assert_eq!(aggregator.cache.max_size, 100);
        assert_eq!(
            aggregator.min_intervals.get("COINGECKO"),
            Some(&Duration::from_secs(2))
        );

        let ids: Vec<&str> = config.providers().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["COINGECKO", "COOKIE_FUN"]);
    }

    #[test]
    fn test_explicit_priority_replaces_default_order() {
        let config =
            Config::from_lookup(lookup(&[("COINSIGHT_PROVIDER_PRIORITY", "coingecko")])).unwrap();
        assert_eq!(config.provider_priority, vec!["COINGECKO"]);

        let unlimited =
            Config::from_lookup(lookup(&[("COINSIGHT_RATE_LIMIT_COOKIE_FUN", "0")])).unwrap();
        assert!(unlimited.aggregator_config().min_intervals.is_empty());
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        let err = Config::from_lookup(lookup(&[("COINSIGHT_CACHE_TTL_SECS", "five")])).unwrap_err();
        assert!(err.to_string().contains("COINSIGHT_CACHE_TTL_SECS"));
    }
}
