//! Shared out-of-process cache interface (L2).
//!
//! The tiered cache treats L2 as an opaque key-value capability. Values cross
//! this boundary as serialized JSON so L1 and L2 always hold independent
//! copies. Implementations must report unavailability as an error instead of
//! panicking; the tiered cache degrades to the remaining levels.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Contract for a shared cache level behind the in-process one.
///
/// Same surface as the L1 cache minus the LRU ordering guarantee; an
/// implementation may run its own eviction (TTL-only is typical).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Remove `key`, reporting whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every key starting with `prefix`, returning the number removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    async fn clear(&self) -> Result<()>;

    /// Implementation-defined statistics object for the observability surface.
    async fn stats(&self) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    raw: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Instant::now() > at)
    }
}

/// In-process [`RemoteStore`] used when no shared store is deployed, and in
/// tests. TTL-only expiry, no capacity bound.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(stored) if stored.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(stored) => Ok(Some(stored.raw.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let stored = StoredValue {
            raw: value,
            expires_at: ttl.map(|t| Instant::now() + t),
        };
        self.entries.lock().insert(key.to_string(), stored);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }

    async fn stats(&self) -> Result<serde_json::Value> {
        let entries = self.entries.lock();
        Ok(json!({
            "type": "memory",
            "size": entries.len(),
        }))
    }
}
