//! Fixed-window request limiter over a cache store

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::cache::QuoteCache;
use crate::shared::clock::Clock;
use crate::shared::utils::cache_key;

/// Per-client counter for one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub identifier: String,
    pub endpoint: String,
    pub count: u32,
    /// Unix millis at which the window closes
    pub reset_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub limited: bool,
    pub count: u32,
    pub reset_at: i64,
}

impl RateLimitDecision {
    /// Millis until the window closes, measured from `now`
    pub fn retry_after_ms(&self, now: i64) -> u64 {
        u64::try_from(self.reset_at.saturating_sub(now)).unwrap_or(0)
    }
}

/// Windows live in a cache of their own, never in the quote cache.
/// An unreachable backend reads as "no window yet" and every caller is let through.
#[derive(Clone)]
pub struct RateLimiter {
    cache: QuoteCache,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(cache: QuoteCache, clock: Arc<dyn Clock>) -> Self {
        Self { cache, clock }
    }

    /// The store holding the windows
    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    fn key(identifier: &str, endpoint: &str) -> String {
        cache_key(&["ratelimit", endpoint, identifier])
    }

    /// Record one request and report whether it exceeds `max_requests`
    pub async fn check(
        &self,
        identifier: &str,
        endpoint: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> RateLimitDecision {
        let key = Self::key(identifier, endpoint);
        let now = self.clock.now_millis();
        let window_ms = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);

        let window = match self.cache.get::<RateLimitWindow>(&key).await {
            Some(mut window) if now <= window.reset_at => {
                window.count = window.count.saturating_add(1);
                window
            }
            _ => RateLimitWindow {
                identifier: identifier.to_string(),
                endpoint: endpoint.to_string(),
                count: 1,
                reset_at: now.saturating_add(window_ms),
            },
        };

        // keep the entry a little past reset_at so the boundary check above decides
        let remaining_ms = u64::try_from(window.reset_at.saturating_sub(now)).unwrap_or(0);
        self.cache
            .set_with_ttl(&key, &window, Duration::from_millis(remaining_ms) + Duration::from_secs(1))
            .await;

        let limited = window.count > max_requests;
        if limited {
            warn!(
                identifier,
                endpoint,
                count = window.count,
                max_requests,
                "🚫 Rate limit exceeded"
            );
        } else {
            debug!(identifier, endpoint, count = window.count, "Rate limit window updated");
        }

        RateLimitDecision {
            limited,
            count: window.count,
            reset_at: window.reset_at,
        }
    }

    pub async fn is_rate_limited(
        &self,
        identifier: &str,
        endpoint: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> bool {
        self.check(identifier, endpoint, max_requests, window_secs)
            .await
            .limited
    }

    /// Current window, if one is open
    pub async fn window(&self, identifier: &str, endpoint: &str) -> Option<RateLimitWindow> {
        let now = self.clock.now_millis();
        self.cache
            .get::<RateLimitWindow>(&Self::key(identifier, endpoint))
            .await
            .filter(|w| now <= w.reset_at)
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::{MemoryCacheBackend, UnreachableCacheBackend};
    use crate::shared::clock::ManualClock;

    fn limiter() -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let backend = Arc::new(MemoryCacheBackend::new(clock.clone(), 100));
        let limiter = RateLimiter::new(QuoteCache::new(backend), clock.clone());
        (clock, limiter)
    }

    #[tokio::test]
    async fn test_fourth_call_is_limited() {
        let (_clock, limiter) = limiter();
        let mut results = Vec::new();
        for _ in 0..4 {
            results.push(limiter.is_rate_limited("client-1", "swap_quote", 3, 60).await);
        }
        assert_eq!(results, vec![false, false, false, true]);
    }

    #[tokio::test]
    async fn test_window_resets_after_expiry() {
        let (clock, limiter) = limiter();
        for _ in 0..4 {
            limiter.check("client-1", "swap_quote", 3, 60).await;
        }

        clock.advance(Duration::from_secs(61));
        let decision = limiter.check("client-1", "swap_quote", 3, 60).await;
        assert!(!decision.limited);
        assert_eq!(decision.count, 1);
    }

    #[tokio::test]
    async fn test_exceeding_keeps_reset_at() {
        let (clock, limiter) = limiter();
        let first = limiter.check("client-1", "swap_quote", 1, 60).await;

        clock.advance(Duration::from_secs(30));
        let second = limiter.check("client-1", "swap_quote", 1, 60).await;
        assert!(second.limited);
        assert_eq!(second.count, 2);
        assert_eq!(second.reset_at, first.reset_at);
        assert_eq!(second.retry_after_ms(clock.now_millis()), 30_000);

        let window = limiter.window("client-1", "swap_quote").await.unwrap();
        assert_eq!(window.count, 2);
    }

    #[tokio::test]
    async fn test_windows_are_per_identifier_and_endpoint() {
        let (_clock, limiter) = limiter();
        assert!(!limiter.is_rate_limited("a", "swap_quote", 1, 60).await);
        assert!(limiter.is_rate_limited("a", "swap_quote", 1, 60).await);

        assert!(!limiter.is_rate_limited("b", "swap_quote", 1, 60).await);
        assert!(!limiter.is_rate_limited("a", "token_list", 1, 60).await);
    }

    #[tokio::test]
    async fn test_unreachable_cache_fails_open() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::new(QuoteCache::new(Arc::new(UnreachableCacheBackend)), clock);
        for _ in 0..10 {
            assert!(!limiter.is_rate_limited("client-1", "swap_quote", 3, 60).await);
        }
    }
}
