use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::CacheBackend;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

/// Typed JSON view over a `CacheBackend`.
///
/// Backend failures never reach the caller: reads degrade to a miss and
/// writes become no-ops, each logged at warn level.
#[derive(Clone)]
pub struct QuoteCache {
    backend: Arc<dyn CacheBackend>,
    counters: Arc<Counters>,
}

impl QuoteCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            counters: Arc::new(Counters::default()),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Cache read failed, treating as miss");
                None
            }
        };

        let Some(raw) = raw else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Dropping undecodable cache entry");
                if let Err(e) = self.backend.delete(key).await {
                    warn!(key, error = %e, "Cache delete failed");
                }
                None
            }
        }
    }

    /// Store `value` for `ttl_seconds`
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        self.set_with_ttl(key, value, Duration::from_secs(ttl_seconds)).await
    }

    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Failed to encode cache value");
                return;
            }
        };

        match self.backend.set(key, raw, ttl).await {
            Ok(()) => {
                self.counters.sets.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Cache write failed");
            }
        }
    }

    /// Cached value for `key`, or compute and store it. Errors are not cached.
    pub async fn get_or_try_set<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        self.set_with_ttl(key, &value, ttl).await;
        Ok(value)
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!(key, error = %e, "Cache delete failed");
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.backend.flush().await {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Cache flush failed");
        }
    }

    /// Number of expired entries removed
    pub async fn purge_expired(&self) -> usize {
        match self.backend.purge_expired().await {
            Ok(n) => n,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Cache purge failed");
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            hits,
            misses,
            sets: self.counters.sets.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}
