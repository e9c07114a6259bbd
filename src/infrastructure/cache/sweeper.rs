use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::QuoteCache;

/// Background task that periodically purges expired entries from each
/// cache it was given. The task stops when the sweeper is dropped.
pub struct CacheSweeper {
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    pub fn spawn(caches: Vec<QuoteCache>, every: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let mut purged = 0;
                for cache in &caches {
                    purged += cache.purge_expired().await;
                }
                if purged > 0 {
                    debug!(purged, "🧹 Purged expired cache entries");
                }
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
