// Bounded in-process LRU cache with optional per-entry TTL (L1)
// Author: kelexine (https://github.com/kelexine)

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Snapshot of a cache's counters, exposed through the observability surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Hit percentage over all lookups since the last `clear`, rounded to
    /// two decimal places.
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Option<Duration>,
}

impl<V> Entry<V> {
    fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.inserted_at.elapsed() > ttl,
            None => false,
        }
    }
}

struct Inner<V> {
    entries: LruCache<String, Entry<V>>,
    hits: u64,
    misses: u64,
}

/// Fixed-capacity LRU cache with lazy TTL expiration.
///
/// Expired entries are purged when they are observed, not by a background
/// sweep. Every operation is serialized behind a single lock scoped to this
/// instance; nothing blocking runs under it.
pub struct BoundedTtlCache<V> {
    capacity: usize,
    default_ttl: Option<Duration>,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> BoundedTtlCache<V> {
    /// Create a cache holding at most `capacity` entries. A capacity of zero
    /// stores nothing and reports every lookup as a miss. `default_ttl`
    /// applies to entries inserted without an explicit TTL; `None` means
    /// entries only leave under LRU pressure.
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            capacity,
            default_ttl,
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Look up `key`, marking it most-recently-used on a hit. An entry whose
    /// TTL has elapsed is purged and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();

        let expired = matches!(inner.entries.peek(key), Some(e) if e.is_expired());
        if expired {
            inner.entries.pop(key);
            debug!(key, "purged expired cache entry");
        }

        let value = inner.entries.get(key).map(|e| e.value.clone());
        match value {
            Some(v) => {
                inner.hits += 1;
                Some(v)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Read `key` without touching its LRU position or the hit/miss counters.
    pub fn peek(&self, key: &str) -> Option<V> {
        let inner = self.inner.lock();
        inner
            .entries
            .peek(key)
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone())
    }

    /// Insert or replace `key`. Replacing resets the value, the LRU position
    /// and the TTL clock. When the cache is full and `key` is new, the
    /// least-recently-used live entry is evicted; entries at the cold end
    /// whose TTL already elapsed are purged first so they never cost a live
    /// entry its slot.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
            ttl: ttl.or(self.default_ttl),
        };

        let mut inner = self.inner.lock();
        if inner.entries.len() >= self.capacity && !inner.entries.contains(&key) {
            while inner.entries.len() >= self.capacity {
                let stale = match inner.entries.peek_lru() {
                    Some((k, e)) if e.is_expired() => Some(k.clone()),
                    _ => None,
                };
                match stale {
                    Some(k) => {
                        inner.entries.pop(&k);
                    }
                    None => break,
                }
            }
            if inner.entries.len() >= self.capacity {
                if let Some((evicted, _)) = inner.entries.pop_lru() {
                    debug!(key = %evicted, "evicted least-recently-used cache entry");
                }
            }
        }
        inner.entries.put(key, entry);
    }

    /// Remove `key`, reporting whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.pop(key).is_some()
    }

    /// Remove every key starting with `prefix`, returning the number removed.
    pub fn delete_prefix(&self, prefix: &str) -> u64 {
        let mut inner = self.inner.lock();
        let doomed: Vec<String> = inner
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            inner.entries.pop(key);
        }
        doomed.len() as u64
    }

    /// Empty the cache and reset the hit/miss counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    /// True when `key` is present and not expired. Does not touch LRU order.
    pub fn contains(&self, key: &str) -> bool {
        let inner = self.inner.lock();
        matches!(inner.entries.peek(key), Some(e) if !e.is_expired())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.hits + inner.misses;
        let hit_rate = if total > 0 {
            ((inner.hits as f64 / total as f64) * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        CacheStats {
            size: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_roundtrip() {
        let cache: BoundedTtlCache<String> = BoundedTtlCache::new(4, None);
        cache.set("a", "alpha".to_string(), None);
        assert_eq!(cache.get("a"), Some("alpha".to_string()));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_eviction_prefers_expired_entries() {
        let cache: BoundedTtlCache<u32> = BoundedTtlCache::new(2, None);
        cache.set("stale", 1, Some(Duration::from_millis(0)));
        cache.set("live", 2, None);
        std::thread::sleep(Duration::from_millis(5));
        // "stale" is at the cold end and expired; inserting must purge it
        // rather than evict "live".
        cache.set("new", 3, None);
        assert!(cache.contains("live"));
        assert!(cache.contains("new"));
        assert!(!cache.contains("stale"));
    }

    #[test]
    fn test_replace_resets_lru_position() {
        let cache: BoundedTtlCache<u32> = BoundedTtlCache::new(2, None);
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.set("a", 10, None);
        cache.set("c", 3, None); // evicts "b", the least recently touched
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache: BoundedTtlCache<u32> = BoundedTtlCache::new(0, None);
        cache.set("a", 1, None);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.stats().capacity, 0);
    }

    #[test]
    fn test_capacity_one_evicts_on_second_insert() {
        let cache: BoundedTtlCache<u32> = BoundedTtlCache::new(1, None);
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_delete_prefix() {
        let cache: BoundedTtlCache<u32> = BoundedTtlCache::new(8, None);
        cache.set("poi:search:beijing:food", 1, None);
        cache.set("poi:search:shanghai:food", 2, None);
        cache.set("weather:current:beijing", 3, None);
        assert_eq!(cache.delete_prefix("poi:search:"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("weather:current:beijing"));
    }
}
