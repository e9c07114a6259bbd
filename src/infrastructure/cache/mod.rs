//! Key/value cache with per-entry TTL
//!
//! The engine only talks to `CacheBackend`; whether entries live in process
//! memory or in a networked store is a deployment choice.

mod memory;
mod quote_cache;
mod sweeper;

pub use memory::MemoryCacheBackend;
pub use quote_cache::{CacheStats, QuoteCache};
pub use sweeper::CacheSweeper;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::UnreachableCacheBackend;

use async_trait::async_trait;
use std::time::Duration;

use crate::shared::errors::CacheError;

/// Backing store operations the engine depends on
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Stored value, or `None` when absent or older than its TTL
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn flush(&self) -> Result<(), CacheError>;

    /// Eagerly drop expired entries. Stores with native expiry do nothing.
    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
}
