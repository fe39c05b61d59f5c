//! Bounded in-memory cache with absolute expiry.
//!
//! Entries expire `ttl` after they were written. When an insert pushes the
//! cache past `max_size`, the entry with the oldest insertion is evicted.
//! Eviction is strictly FIFO: reads never refresh an entry's position.
//!
//! A single mutex guards the map and its insertion index. A background
//! sweeper (see [`TtlCache::spawn_sweeper`]) purges expired entries so that
//! memory stays bounded even when nothing reads the cache.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::errors::ConfigurationError;

/// Lower bound on the sweep period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Cache sizing and expiry.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long an entry stays readable after it is written.
    pub ttl: Duration,
    /// Maximum number of live entries.
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_size: 1000,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.ttl.is_zero() {
            return Err(ConfigurationError::ZeroTtl);
        }
        if self.max_size == 0 {
            return Err(ConfigurationError::ZeroMaxSize);
        }
        Ok(())
    }

    /// Period of the background sweep: half the TTL, never under a minute.
    pub fn sweep_interval(&self) -> Duration {
        (self.ttl / 2).max(MIN_SWEEP_INTERVAL)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    expires_at: Instant,
    /// Position in the insertion index.
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Insertion sequence -> key. The smallest sequence is the oldest insertion.
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// Thread-safe TTL cache with insertion-order eviction.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    config: CacheConfig,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Create an empty cache, rejecting a zero TTL or zero capacity.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
            }),
            config,
        })
    }

    /// Lock the cache state, recovering from poison if necessary.
    ///
    /// Every mutation leaves the map and index consistent before it can
    /// panic, so the poisoned state is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Store `value` under `key`, expiring `ttl` from now.
    ///
    /// Overwriting a key gives it a fresh insertion position. If the cache
    /// then holds more than `max_size` entries, the oldest insertion goes.
    pub fn set(&self, key: K, value: V) {
        let now = Instant::now();
        let mut inner = self.lock();

        inner.remove(&key);

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                data: value,
                expires_at: now + self.config.ttl,
                seq,
            },
        );

        while inner.entries.len() > self.config.max_size {
            if inner.evict_oldest().is_none() {
                break;
            }
            debug!("Cache: evicted oldest entry (max size {})", self.config.max_size);
        }
    }

    /// Return the value for `key` if present and unexpired.
    ///
    /// A stale entry is removed on the way out, so later reads keep missing.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            inner.remove(key);
            return None;
        }

        inner.entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();

        let stale: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            inner.remove(key);
        }

        stale.len()
    }

    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let period = self.config.sweep_interval();
        let weak = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired();
                if purged > 0 {
                    debug!("Cache sweep: purged {} expired entries", purged);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache_with(ttl_ms: u64, max_size: usize) -> TtlCache<String, serde_json::Value> {
        TtlCache::new(CacheConfig {
            ttl: Duration::from_millis(ttl_ms),
            max_size,
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_zero_ttl_and_size() {
        let zero_ttl = TtlCache::<String, u32>::new(CacheConfig {
            ttl: Duration::ZERO,
            max_size: 10,
        });
        assert_eq!(zero_ttl.unwrap_err(), ConfigurationError::ZeroTtl);

        let zero_size = TtlCache::<String, u32>::new(CacheConfig {
            ttl: Duration::from_secs(1),
            max_size: 0,
        });
        assert_eq!(zero_size.unwrap_err(), ConfigurationError::ZeroMaxSize);
    }

    #[tokio::test]
    async fn test_set_get_preserves_nested_and_null_payloads() {
        let cache = cache_with(60_000, 10);

        let nested = json!({"price": 50000, "tags": ["l1", {"deep": null}]});
        cache.set("nested".to_string(), nested.clone());
        cache.set("null".to_string(), serde_json::Value::Null);

        assert_eq!(cache.get(&"nested".to_string()), Some(nested));
        assert_eq!(cache.get(&"null".to_string()), Some(serde_json::Value::Null));
        assert_eq!(cache.get(&"missing".to_string()), None);
    }

    #[tokio::test]
    async fn test_fifo_eviction_of_oldest_insertion() {
        let cache = cache_with(60_000, 3);

        for i in 1..=4 {
            cache.set(format!("key{}", i), json!(i));
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&"key1".to_string()), None);
        assert_eq!(cache.get(&"key2".to_string()), Some(json!(2)));
        assert_eq!(cache.get(&"key3".to_string()), Some(json!(3)));
        assert_eq!(cache.get(&"key4".to_string()), Some(json!(4)));
    }

    #[tokio::test]
    async fn test_reads_do_not_refresh_eviction_order() {
        let cache = cache_with(60_000, 2);

        cache.set("a".to_string(), json!(1));
        cache.set("b".to_string(), json!(2));
        // An LRU would now evict "b"; FIFO still evicts "a".
        assert!(cache.get(&"a".to_string()).is_some());
        cache.set("c".to_string(), json!(3));

        assert_eq!(cache.get(&"a".to_string()), None);
        assert!(cache.get(&"b".to_string()).is_some());
        assert!(cache.get(&"c".to_string()).is_some());
    }

    #[tokio::test]
    async fn test_overwrite_moves_key_to_newest_position() {
        let cache = cache_with(60_000, 2);

        cache.set("a".to_string(), json!(1));
        cache.set("b".to_string(), json!(2));
        cache.set("a".to_string(), json!(10));
        cache.set("c".to_string(), json!(3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.get(&"a".to_string()), Some(json!(10)));
    }

    #[tokio::test]
    async fn test_many_sets_never_exceed_max_size() {
        let cache = cache_with(60_000, 5);
        for i in 0..50 {
            cache.set(format!("k{}", i), json!(i));
            assert!(cache.len() <= 5);
        }
        // Survivors are the five most recent insertions.
        for i in 45..50 {
            assert!(cache.get(&format!("k{}", i)).is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_stays_gone() {
        let cache = cache_with(1_000, 10);
        cache.set("btc".to_string(), json!(50000));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(cache.get(&"btc".to_string()).is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get(&"btc".to_string()), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&"btc".to_string()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_only_removes_stale_entries() {
        let cache = cache_with(1_000, 10);
        cache.set("old".to_string(), json!(1));
        tokio::time::advance(Duration::from_millis(600)).await;
        cache.set("new".to_string(), json!(2));
        tokio::time::advance(Duration::from_millis(500)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&"new".to_string()).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_without_reads() {
        let cache = Arc::new(cache_with(60_000, 10));
        cache.set("btc".to_string(), json!(1));
        let handle = cache.spawn_sweeper();

        // Sweep runs every max(ttl / 2, 60s) = 60s; the entry expires at 60s.
        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(cache.len(), 0);

        handle.abort();
    }

    #[test]
    fn test_sweep_interval_floor() {
        let short = CacheConfig {
            ttl: Duration::from_secs(30),
            max_size: 1,
        };
        assert_eq!(short.sweep_interval(), Duration::from_secs(60));

        let long = CacheConfig {
            ttl: Duration::from_secs(600),
            max_size: 1,
        };
        assert_eq!(long.sweep_interval(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_bound() {
        let cache = Arc::new(cache_with(60_000, 16));
        let mut handles = Vec::new();
        for t in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    cache.set(format!("{}-{}", t, i), json!(i));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.len(), 16);
    }
}
