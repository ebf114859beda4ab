//! In-memory cache of the last live max-pain result per symbol.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{MaxPainResult, Symbol};

/// Live results are served from cache for one hour.
pub const RESULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Storage key for a symbol's result, shared with the remote worker's KV layout.
pub fn cache_key(symbol: &Symbol) -> String {
    format!("max-pain:{}", symbol.as_str())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: MaxPainResult,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl CacheInner {
    fn get(&self, key: &str) -> Option<MaxPainResult> {
        self.map
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.result.clone())
    }

    fn put(&mut self, result: MaxPainResult, ttl: Duration) {
        let key = cache_key(&result.symbol);
        let expires_at = Instant::now() + ttl;
        self.map.insert(key, CacheEntry { result, expires_at });
    }
}

/// Thread-safe TTL cache keyed by `max-pain:{SYMBOL}`.
///
/// Each put replaces the whole entry; entries are never merged.
#[derive(Debug, Clone)]
pub struct ResultCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(RESULT_CACHE_TTL)
    }
}

impl ResultCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                map: HashMap::new(),
                default_ttl,
            })),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns the cached result for `symbol` if it has not expired.
    pub async fn get(&self, symbol: &Symbol) -> Option<MaxPainResult> {
        self.inner.read().await.get(&cache_key(symbol))
    }

    /// Stores `result` under its symbol for the default TTL.
    pub async fn put(&self, result: MaxPainResult) {
        let mut store = self.inner.write().await;
        if store.default_ttl.is_zero() {
            return;
        }
        let ttl = store.default_ttl;
        store.put(result, ttl);
    }

    pub async fn put_with_ttl(&self, result: MaxPainResult, ttl: Duration) {
        let mut store = self.inner.write().await;
        if store.default_ttl.is_zero() || ttl.is_zero() {
            return;
        }
        store.put(result, ttl);
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.inner
            .write()
            .await
            .map
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Number of entries held, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_disabled(&self) -> bool {
        self.inner.read().await.default_ttl.is_zero()
    }
}
