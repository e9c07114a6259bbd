use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::CacheBackend;
use crate::shared::clock::{duration_millis, Clock};
use crate::shared::errors::CacheError;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    inserted_at: i64,
    ttl_ms: i64,
    last_accessed: i64,
}

impl CacheEntry {
    fn is_valid(&self, now: i64) -> bool {
        now.saturating_sub(self.inserted_at) < self.ttl_ms
    }
}

/// In-process backend with lazy expiry and LRU eviction at capacity
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
    evictions: AtomicU64,
}

impl MemoryCacheBackend {
    pub fn new(clock: Arc<dyn Clock>, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_entries: max_entries.max(1),
            evictions: AtomicU64::new(0),
        }
    }

    /// No capacity bound; entries leave only by expiry, delete or flush
    pub fn unbounded(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, usize::MAX)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_valid(now) {
                entry.last_accessed = now;
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            entries.retain(|_, e| e.is_valid(now));
            if entries.len() >= self.max_entries {
                let lru_key = entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_accessed)
                    .map(|(k, _)| k.clone());
                if let Some(lru_key) = lru_key {
                    debug!(key = %lru_key, "Evicting least recently used cache entry");
                    entries.remove(&lru_key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: now,
                ttl_ms: duration_millis(ttl),
                last_accessed: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_valid(now));
        Ok(before - entries.len())
    }
}

/// Backend whose every operation fails, standing in for a store that is down
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct UnreachableCacheBackend;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl CacheBackend for UnreachableCacheBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn flush(&self) -> Result<(), CacheError> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Err(CacheError::Unreachable("connection refused".to_string()))
    }
}
