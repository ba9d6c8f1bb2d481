//! Tiered cache: in-process L1, optional shared L2, optional fetch-on-miss L3.
//!
//! Reads promote upward (an L2 hit populates L1), writes go through every
//! configured level. Backing-store failures degrade a read to the remaining
//! levels; they never fail the lookup.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::cache::lru::{BoundedTtlCache, CacheStats};
use crate::cache::store::RemoteStore;
use crate::error::Result;
use crate::metrics;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetch-on-miss callback (L3). Returns the authoritative value for a key,
/// or `None` when the key has no value upstream. Must not cache on its own.
pub type Fetcher<V> = Arc<dyn Fn(&str) -> BoxFuture<'static, Option<V>> + Send + Sync>;

/// Wrap an async closure as a [`Fetcher`].
pub fn fetcher<V, F, Fut>(f: F) -> Fetcher<V>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<V>> + Send + 'static,
{
    Arc::new(move |key: &str| Box::pin(f(key.to_string())) as BoxFuture<'static, Option<V>>)
}

/// Combined statistics for one tiered cache.
#[derive(Debug, Clone, Serialize)]
pub struct TieredStats {
    pub l1: CacheStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l2: Option<serde_json::Value>,
}

/// A single `get`/`set`/`delete` surface over up to three backing levels.
///
/// Values are held by value in L1 and serialized to JSON for L2, so the two
/// levels never share a reference.
pub struct TieredCache<V> {
    name: String,
    l1: BoundedTtlCache<V>,
    l2: Option<Arc<dyn RemoteStore>>,
    l3: Option<Fetcher<V>>,
    l1_ttl: Option<Duration>,
    l2_ttl: Option<Duration>,
}

impl<V> TieredCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Create an L1-only cache. `name` labels log lines and metrics.
    pub fn new(name: impl Into<String>, l1_capacity: usize) -> Self {
        Self {
            name: name.into(),
            l1: BoundedTtlCache::new(l1_capacity, None),
            l2: None,
            l3: None,
            l1_ttl: None,
            l2_ttl: None,
        }
    }

    /// Attach a shared L2 store.
    pub fn with_remote(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.l2 = Some(store);
        self
    }

    /// Attach a fetch-on-miss callback (L3).
    pub fn with_fetcher(mut self, fetch: Fetcher<V>) -> Self {
        self.l3 = Some(fetch);
        self
    }

    /// Default TTLs applied when `set` (or promotion / write-through) is not
    /// given explicit ones.
    pub fn with_default_ttls(mut self, l1_ttl: Option<Duration>, l2_ttl: Option<Duration>) -> Self {
        self.l1_ttl = l1_ttl;
        self.l2_ttl = l2_ttl;
        self
    }

    /// Direct handle to the L1 level, for inspection and tests.
    pub fn l1(&self) -> &BoundedTtlCache<V> {
        &self.l1
    }

    /// Look up `key` through the levels in order.
    ///
    /// An L2 hit is promoted into L1 (with this cache's default L1 TTL; the
    /// L2 entry's own TTL is left alone). An L3 result is written through to
    /// both levels. Store and decode failures are logged and degrade the
    /// lookup to the next level.
    ///
    /// Concurrent misses on the same cold key are not deduplicated: each
    /// caller that reaches L3 invokes the fetcher. First writer wins; the
    /// later write replaces it with an equal value.
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.l1.get(key) {
            debug!(cache = %self.name, key, "l1 hit");
            metrics::record_cache_op(&self.name, "l1_hit");
            return Some(value);
        }

        if let Some(store) = &self.l2 {
            match store.get(key).await {
                Ok(Some(raw)) => match serde_json::from_str::<V>(&raw) {
                    Ok(value) => {
                        debug!(cache = %self.name, key, "l2 hit, promoting to l1");
                        metrics::record_cache_op(&self.name, "l2_hit");
                        self.l1.set(key, value.clone(), self.l1_ttl);
                        return Some(value);
                    }
                    Err(err) => {
                        warn!(cache = %self.name, key, error = %err, "l2 entry failed to decode, treating as miss");
                    }
                },
                Ok(None) => {}
                Err(err) => {
                    warn!(cache = %self.name, key, error = %err, "l2 unavailable, degrading to remaining levels");
                }
            }
        }

        if let Some(fetch) = &self.l3 {
            debug!(cache = %self.name, key, "fetching from source");
            let value = fetch(key).await;
            if let Some(v) = &value {
                metrics::record_cache_op(&self.name, "l3_fetch");
                self.l1.set(key, v.clone(), self.l1_ttl);
                if let Some(store) = &self.l2 {
                    if let Err(err) = self.write_remote(store, key, v).await {
                        warn!(cache = %self.name, key, error = %err, "l2 write-through failed after fetch");
                    }
                }
            }
            if value.is_none() {
                metrics::record_cache_op(&self.name, "miss");
            }
            return value;
        }

        metrics::record_cache_op(&self.name, "miss");
        None
    }

    /// Write `key` through every configured level. L1 always takes the
    /// write; the overall result is `Ok` only when every configured level
    /// succeeded. Nothing is rolled back and nothing is retried here -
    /// callers wanting retries wrap `set` themselves.
    pub async fn set(
        &self,
        key: &str,
        value: V,
        l1_ttl: Option<Duration>,
        l2_ttl: Option<Duration>,
    ) -> Result<()> {
        self.l1.set(key, value.clone(), l1_ttl.or(self.l1_ttl));
        if let Some(store) = &self.l2 {
            let raw = serde_json::to_string(&value)?;
            store.set(key, raw, l2_ttl.or(self.l2_ttl)).await?;
        }
        metrics::record_cache_op(&self.name, "write");
        metrics::update_cache_entries(&self.name, self.l1.len());
        Ok(())
    }

    /// Remove `key` from every configured level. Partial failure is reported
    /// as an error, but each level that could be cleared has been.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut existed = self.l1.delete(key);
        if let Some(store) = &self.l2 {
            existed |= store.delete(key).await?;
        }
        metrics::update_cache_entries(&self.name, self.l1.len());
        Ok(existed)
    }

    /// Remove every key starting with `prefix` from both levels, returning
    /// the total number removed.
    pub async fn invalidate_prefix(&self, prefix: &str) -> Result<u64> {
        let mut removed = self.l1.delete_prefix(prefix);
        if let Some(store) = &self.l2 {
            removed += store.delete_prefix(prefix).await?;
        }
        debug!(cache = %self.name, prefix, removed, "invalidated by prefix");
        metrics::update_cache_entries(&self.name, self.l1.len());
        Ok(removed)
    }

    /// Empty every configured level. L1 is cleared first so the operation
    /// clears what it can even when L2 fails.
    pub async fn clear(&self) -> Result<()> {
        self.l1.clear();
        if let Some(store) = &self.l2 {
            store.clear().await?;
        }
        metrics::update_cache_entries(&self.name, 0);
        Ok(())
    }

    /// Pre-populate the cache for `keys` using `fetch` (or the configured L3
    /// fetcher). Failures are isolated per key and logged; the batch never
    /// aborts. Returns the number of keys successfully cached.
    pub async fn warm_up(&self, keys: &[String], fetch: Option<&Fetcher<V>>) -> usize {
        let Some(fetch) = fetch.or(self.l3.as_ref()) else {
            warn!(cache = %self.name, "no fetcher available, skipping warm-up");
            return 0;
        };

        let mut warmed = 0;
        for key in keys {
            match fetch(key.as_str()).await {
                Some(value) => match self.set(key, value, None, None).await {
                    Ok(()) => {
                        debug!(cache = %self.name, key = %key, "warmed up");
                        warmed += 1;
                    }
                    Err(err) => {
                        warn!(cache = %self.name, key = %key, error = %err, "warm-up write failed");
                    }
                },
                None => {
                    debug!(cache = %self.name, key = %key, "warm-up fetch returned nothing");
                }
            }
        }
        debug!(cache = %self.name, warmed, total = keys.len(), "warm-up finished");
        warmed
    }

    /// Combined L1/L2 statistics. An unavailable L2 reports no stats rather
    /// than failing the call.
    pub async fn stats(&self) -> TieredStats {
        let l2 = match &self.l2 {
            Some(store) => match store.stats().await {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(cache = %self.name, error = %err, "l2 stats unavailable");
                    None
                }
            },
            None => None,
        };
        TieredStats {
            l1: self.l1.stats(),
            l2,
        }
    }

    async fn write_remote(&self, store: &Arc<dyn RemoteStore>, key: &str, value: &V) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        store.set(key, raw, self.l2_ttl).await
    }
}
