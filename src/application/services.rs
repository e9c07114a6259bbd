//! Quote service facade consumed by the API layer

use num_traits::Zero;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::aggregator::{AggregatorSettings, QuoteAggregator, RouteReport};
use crate::domain::dex::{PriceSource, QuoteFetcher, SourceRegistry};
use crate::domain::quote::{RouteSelector, SlippageTolerance, SwapQuote};
use crate::domain::token::{StaticTokenRegistry, TokenRegistry};
use crate::infrastructure::blockchain::RouterQuoteFetcher;
use crate::infrastructure::cache::{CacheBackend, CacheStats, CacheSweeper, MemoryCacheBackend, QuoteCache};
use crate::infrastructure::rate_limit::RateLimiter;
use crate::shared::clock::{Clock, SystemClock};
use crate::shared::config::{EngineConfig, RateLimitCfg};
use crate::shared::errors::{AppError, QuoteError};
use crate::shared::types::{Amount, ChainId, Token};
use crate::shared::utils::parse_units;

/// Assembles a `QuoteService`; every collaborator can be swapped out
pub struct QuoteServiceBuilder {
    config: EngineConfig,
    fetcher: Option<Arc<dyn QuoteFetcher>>,
    backend: Option<Arc<dyn CacheBackend>>,
    rate_limit_backend: Option<Arc<dyn CacheBackend>>,
    clock: Option<Arc<dyn Clock>>,
    tokens: Option<Arc<dyn TokenRegistry>>,
    sources: Option<Vec<PriceSource>>,
}

impl QuoteServiceBuilder {
    pub fn fetcher(mut self, fetcher: Arc<dyn QuoteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Store for rate-limit windows; must not be the quote cache backend
    pub fn rate_limit_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.rate_limit_backend = Some(backend);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn token_registry(mut self, tokens: Arc<dyn TokenRegistry>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Replace the configured `[[sources]]`
    pub fn sources(mut self, sources: Vec<PriceSource>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Build without a background sweeper; expired entries are still
    /// dropped lazily on read
    pub fn build(self) -> Result<QuoteService, AppError> {
        let config = self.config;
        config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryCacheBackend::new(clock.clone(), config.cache.max_entries)));
        let rate_limit_backend = self
            .rate_limit_backend
            .unwrap_or_else(|| Arc::new(MemoryCacheBackend::unbounded(clock.clone())));
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(RouterQuoteFetcher::new(config.engine.fetch_timeout(), clock.clone())?),
        };
        let tokens = self
            .tokens
            .unwrap_or_else(|| Arc::new(StaticTokenRegistry::new(config.tokens.clone())));
        let registry = Arc::new(SourceRegistry::new(
            self.sources.unwrap_or_else(|| config.sources.clone()),
        ));

        let cache = QuoteCache::new(backend);
        let aggregator = QuoteAggregator::new(
            registry,
            fetcher,
            cache.clone(),
            RouteSelector::new(config.engine.route_policy),
            AggregatorSettings::from_config(&config.engine)?,
            clock.clone(),
        );

        Ok(QuoteService {
            aggregator,
            tokens,
            limiter: RateLimiter::new(QuoteCache::new(rate_limit_backend), clock),
            rate_limit: config.rate_limit.clone(),
            cache,
            sweeper: None,
            sweep_interval: Duration::from_secs(config.cache.sweep_interval_secs),
        })
    }
}

/// Entry point for quoting swaps by token address and human-readable amount
pub struct QuoteService {
    aggregator: QuoteAggregator,
    tokens: Arc<dyn TokenRegistry>,
    limiter: RateLimiter,
    rate_limit: RateLimitCfg,
    cache: QuoteCache,
    sweeper: Option<CacheSweeper>,
    sweep_interval: Duration,
}

impl QuoteService {
    pub fn builder(config: EngineConfig) -> QuoteServiceBuilder {
        QuoteServiceBuilder {
            config,
            fetcher: None,
            backend: None,
            rate_limit_backend: None,
            clock: None,
            tokens: None,
            sources: None,
        }
    }

    /// Production wiring: router fetcher, in-memory cache and the
    /// background sweeper. Pair with `shutdown`.
    pub async fn connect(config: EngineConfig) -> Result<Self, AppError> {
        let mut service = Self::builder(config).build()?;
        service.start_sweeper();

        info!(
            sources = service.aggregator.registry().len(),
            "🚀 Quote service ready"
        );
        Ok(service)
    }

    /// No-op when the sweep interval is zero or a sweeper already runs
    pub fn start_sweeper(&mut self) {
        if self.sweeper.is_none() && !self.sweep_interval.is_zero() {
            let caches = vec![self.cache.clone(), self.limiter.cache().clone()];
            self.sweeper = Some(CacheSweeper::spawn(caches, self.sweep_interval));
        }
    }

    /// Stop background work and flush cached quotes and rate-limit windows
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
        self.cache.clear().await;
        self.limiter.cache().clear().await;
        info!("🛑 Quote service stopped");
    }

    /// Quote `amount` (decimal string in whole tokens) of `token_in` for `token_out`
    pub async fn get_swap_quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount: &str,
        chain_id: ChainId,
    ) -> Result<SwapQuote, QuoteError> {
        let slippage_bps = self.aggregator.settings().slippage.bps();
        self.get_swap_quote_with_slippage(token_in, token_out, amount, chain_id, slippage_bps)
            .await
    }

    pub async fn get_swap_quote_with_slippage(
        &self,
        token_in: &str,
        token_out: &str,
        amount: &str,
        chain_id: ChainId,
        slippage_bps: u32,
    ) -> Result<SwapQuote, QuoteError> {
        SlippageTolerance::from_bps(slippage_bps)?;
        let (token_in, token_out) = self.resolve_pair(token_in, token_out, chain_id).await?;
        let amount_in = parse_amount(amount, &token_in)?;

        self.aggregator
            .aggregate_with_slippage(&token_in, &token_out, &amount_in, slippage_bps)
            .await
    }

    /// `get_swap_quote` behind the configured per-client rate limit
    pub async fn get_swap_quote_for(
        &self,
        identifier: &str,
        token_in: &str,
        token_out: &str,
        amount: &str,
        chain_id: ChainId,
    ) -> Result<SwapQuote, QuoteError> {
        let cfg = &self.rate_limit;
        let decision = self
            .limiter
            .check(identifier, &cfg.endpoint, cfg.max_requests, cfg.window_secs)
            .await;
        if decision.limited {
            return Err(QuoteError::RateLimited {
                endpoint: cfg.endpoint.clone(),
                retry_after_ms: decision.retry_after_ms(self.limiter.now_millis()),
            });
        }

        self.get_swap_quote(token_in, token_out, amount, chain_id).await
    }

    /// Every source's quote for the pair, uncached
    pub async fn compare_routes(
        &self,
        token_in: &str,
        token_out: &str,
        amount: &str,
        chain_id: ChainId,
    ) -> Result<RouteReport, QuoteError> {
        let (token_in, token_out) = self.resolve_pair(token_in, token_out, chain_id).await?;
        let amount_in = parse_amount(amount, &token_in)?;
        self.aggregator.best_route(&token_in, &token_out, &amount_in).await
    }

    pub async fn is_rate_limited(
        &self,
        identifier: &str,
        endpoint: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> bool {
        self.limiter
            .is_rate_limited(identifier, endpoint, max_requests, window_secs)
            .await
    }

    /// Quote cache statistics; rate-limit window reads are not counted
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn aggregator(&self) -> &QuoteAggregator {
        &self.aggregator
    }

    async fn resolve_pair(
        &self,
        token_in: &str,
        token_out: &str,
        chain_id: ChainId,
    ) -> Result<(Token, Token), QuoteError> {
        let (resolved_in, resolved_out) = futures::join!(
            self.tokens.resolve(chain_id, token_in),
            self.tokens.resolve(chain_id, token_out)
        );

        let resolved_in = resolved_in.ok_or_else(|| QuoteError::TokenNotFound {
            chain_id,
            address: token_in.to_string(),
        })?;
        let resolved_out = resolved_out.ok_or_else(|| QuoteError::TokenNotFound {
            chain_id,
            address: token_out.to_string(),
        })?;
        Ok((resolved_in, resolved_out))
    }
}

/// Whole-token decimal string to base units; zero is rejected
fn parse_amount(amount: &str, token: &Token) -> Result<Amount, QuoteError> {
    let amount_in = parse_units(amount, token.decimals)?;
    if amount_in.is_zero() {
        return Err(QuoteError::InvalidAmount("amount must be greater than zero".to_string()));
    }
    Ok(amount_in)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::blockchain::{MockBehavior, MockQuoteFetcher};
    use crate::shared::clock::ManualClock;
    use crate::shared::types::Amount;

    const WNOR: &str = "0x26c0eaF731885b14c031cc50dB79b36458E0b355";
    const USDT: &str = "0xB8fa87a1dAC07e077a51999F5cE79BD236f06acf";
    const ROUTER: &str = "0xbe0d0ec34A93a2Ec08492715a51C613B7E530D80";

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.sources = vec![
            PriceSource::new("NorSwap", 65001, ROUTER, "http://127.0.0.1:8545"),
            PriceSource::new("PancakeSwap", 65001, ROUTER, "http://127.0.0.1:8546"),
        ];
        config.tokens = vec![
            Token::new(WNOR, "WNOR", 18, 65001),
            Token::new(USDT, "USDT", 6, 65001),
        ];
        config.rate_limit.max_requests = 3;
        config.rate_limit.window_secs = 60;
        config
    }

    fn service() -> (QuoteService, Arc<MockQuoteFetcher>, Arc<ManualClock>) {
        let fetcher = Arc::new(
            MockQuoteFetcher::new()
                .with("NorSwap", MockBehavior::Quote(Amount::from(2_000_000u32)))
                .with("PancakeSwap", MockBehavior::Quote(Amount::from(2_050_000u32))),
        );
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let service = QuoteService::builder(config())
            .fetcher(fetcher.clone())
            .clock(clock.clone())
            .build()
            .unwrap();
        (service, fetcher, clock)
    }

    #[tokio::test]
    async fn test_get_swap_quote_scenario() {
        let (service, fetcher, _clock) = service();

        let quote = service.get_swap_quote(WNOR, USDT, "1.0", 65001).await.unwrap();
        assert_eq!(quote.amount_in, Amount::from(10u32).pow(18));
        assert_eq!(quote.amount_out, Amount::from(2_050_000u32));
        assert_eq!(quote.amount_out_min, Amount::from(2_009_000u32));
        assert_eq!(quote.route.source, "PancakeSwap");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_addresses_are_case_insensitive() {
        let (service, _fetcher, _clock) = service();
        let quote = service
            .get_swap_quote(&WNOR.to_lowercase(), &USDT.to_uppercase().replace("0X", "0x"), "2", 65001)
            .await
            .unwrap();
        assert_eq!(quote.amount_in, Amount::from(2u32) * Amount::from(10u32).pow(18));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (service, fetcher, _clock) = service();
        let unknown = "0x0000000000000000000000000000000000000001";

        let err = service.get_swap_quote(WNOR, unknown, "1.0", 65001).await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::TokenNotFound {
                chain_id: 65001,
                address: unknown.to_string()
            }
        );

        // known address, wrong chain
        let err = service.get_swap_quote(WNOR, USDT, "1.0", 56).await.unwrap_err();
        assert!(matches!(err, QuoteError::TokenNotFound { chain_id: 56, .. }));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejects_bad_amounts() {
        let (service, fetcher, _clock) = service();

        for amount in ["0", "0.000", "", "abc", "-1"] {
            let err = service.get_swap_quote(WNOR, USDT, amount, 65001).await.unwrap_err();
            assert!(matches!(err, QuoteError::InvalidAmount(_)), "{amount}: {err:?}");
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_liquidity_surfaces() {
        let (service, fetcher, _clock) = service();
        fetcher.set("NorSwap", MockBehavior::Fail(crate::shared::errors::UnavailableKind::Network));
        fetcher.set("PancakeSwap", MockBehavior::Quote(Amount::from(0u32)));

        let err = service.get_swap_quote(WNOR, USDT, "1", 65001).await.unwrap_err();
        assert_eq!(err, QuoteError::NoLiquidity);
    }

    #[tokio::test]
    async fn test_rate_limited_wrapper() {
        let (service, fetcher, clock) = service();

        for _ in 0..3 {
            service
                .get_swap_quote_for("10.0.0.1", WNOR, USDT, "1.0", 65001)
                .await
                .unwrap();
        }
        let err = service
            .get_swap_quote_for("10.0.0.1", WNOR, USDT, "1.0", 65001)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            QuoteError::RateLimited {
                endpoint: "swap_quote".to_string(),
                retry_after_ms: 60_000
            }
        );

        // other clients are unaffected
        assert!(service
            .get_swap_quote_for("10.0.0.2", WNOR, USDT, "1.0", 65001)
            .await
            .is_ok());

        clock.advance(Duration::from_secs(61));
        assert!(service
            .get_swap_quote_for("10.0.0.1", WNOR, USDT, "1.0", 65001)
            .await
            .is_ok());
        // one fan-out per cache window
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test]
    async fn test_quote_traffic_cannot_reset_an_open_window() {
        let mut cfg = config();
        cfg.cache.max_entries = 3;
        cfg.rate_limit.max_requests = 1;
        let fetcher = Arc::new(
            MockQuoteFetcher::new().with("NorSwap", MockBehavior::Quote(Amount::from(7u32))),
        );
        let service = QuoteService::builder(cfg)
            .fetcher(fetcher)
            .clock(Arc::new(ManualClock::new(1_700_000_000_000)))
            .build()
            .unwrap();

        assert!(service.get_swap_quote_for("10.0.0.1", WNOR, USDT, "1", 65001).await.is_ok());
        let err = service
            .get_swap_quote_for("10.0.0.1", WNOR, USDT, "1", 65001)
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::RateLimited { .. }));

        // more distinct clients and amounts than the quote cache can hold
        for (i, client) in ["10.0.0.2", "10.0.0.3", "10.0.0.4"].iter().enumerate() {
            let amount = (i + 2).to_string();
            service.get_swap_quote_for(client, WNOR, USDT, &amount, 65001).await.unwrap();
        }

        let err = service
            .get_swap_quote_for("10.0.0.1", WNOR, USDT, "1", 65001)
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_cache_stats_count_only_quote_lookups() {
        let (service, fetcher, _clock) = service();

        for _ in 0..3 {
            service
                .get_swap_quote_for("10.0.0.1", WNOR, USDT, "1.0", 65001)
                .await
                .unwrap();
        }

        let stats = service.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.sets, 1);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_backend_is_pluggable() {
        let clock = Arc::new(ManualClock::new(0));
        let windows = Arc::new(MemoryCacheBackend::unbounded(clock.clone()));
        let service = QuoteService::builder(config())
            .fetcher(Arc::new(MockQuoteFetcher::new()))
            .clock(clock)
            .rate_limit_backend(windows.clone())
            .build()
            .unwrap();

        assert!(!service.is_rate_limited("10.0.0.1", "swap_quote", 3, 60).await);
        assert_eq!(windows.len().await, 1);

        service.shutdown().await;
        assert!(windows.is_empty().await);
    }

    struct CountingTokenRegistry {
        inner: StaticTokenRegistry,
        resolves: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TokenRegistry for CountingTokenRegistry {
        async fn resolve(&self, chain_id: ChainId, address: &str) -> Option<Token> {
            self.resolves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.resolve(chain_id, address).await
        }
    }

    #[tokio::test]
    async fn test_invalid_slippage_rejected_before_token_lookup() {
        let tokens = Arc::new(CountingTokenRegistry {
            inner: StaticTokenRegistry::new(config().tokens),
            resolves: Default::default(),
        });
        let fetcher = Arc::new(MockQuoteFetcher::new());
        let service = QuoteService::builder(config())
            .fetcher(fetcher.clone())
            .token_registry(tokens.clone())
            .build()
            .unwrap();

        let err = service
            .get_swap_quote_with_slippage(WNOR, USDT, "1", 65001, 10_000)
            .await
            .unwrap_err();
        assert_eq!(err, QuoteError::InvalidSlippage(10_000));
        assert_eq!(tokens.resolves.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_compare_routes_rejects_zero_amount() {
        let (service, fetcher, _clock) = service();

        for amount in ["0", "0.000"] {
            let err = service.compare_routes(WNOR, USDT, amount, 65001).await.unwrap_err();
            assert!(matches!(err, QuoteError::InvalidAmount(_)), "{amount}: {err:?}");
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_compare_routes_lists_every_quote() {
        let (service, _fetcher, _clock) = service();
        let report = service.compare_routes(WNOR, USDT, "1.0", 65001).await.unwrap();
        assert_eq!(report.best.source, "PancakeSwap");
        assert_eq!(report.quotes.len(), 2);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_flushes_cache() {
        let fetcher = Arc::new(
            MockQuoteFetcher::new().with("NorSwap", MockBehavior::Quote(Amount::from(5u32))),
        );
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(MemoryCacheBackend::new(clock.clone(), 10));
        let mut service = QuoteService::builder(config())
            .fetcher(fetcher)
            .clock(clock)
            .cache_backend(backend.clone())
            .sources(vec![PriceSource::new("NorSwap", 65001, ROUTER, "http://127.0.0.1:8545")])
            .build()
            .unwrap();
        service.start_sweeper();

        service.get_swap_quote(WNOR, USDT, "1", 65001).await.unwrap();
        assert_eq!(backend.len().await, 1);
        assert_eq!(service.cache_stats().sets, 1);

        service.shutdown().await;
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut bad = config();
        bad.engine.slippage_bps = 10_000;
        let err = QuoteService::builder(bad)
            .fetcher(Arc::new(MockQuoteFetcher::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_connect_uses_router_fetcher() {
        let service = QuoteService::connect(config()).await.unwrap();
        assert_eq!(service.aggregator().registry().len(), 2);
        service.shutdown().await;
    }
}
