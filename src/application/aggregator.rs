//! Quote aggregation: cache lookup, parallel fan-out, route selection and
//! slippage bounding for one trade request

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::domain::dex::{PriceSource, QuoteFetcher, SourceRegistry};
use crate::domain::quote::{Quote, RouteSelector, SlippageTolerance, SwapQuote, SwapRoute};
use crate::infrastructure::cache::QuoteCache;
use crate::shared::clock::Clock;
use crate::shared::config::EngineCfg;
use crate::shared::errors::{QuoteError, SourceUnavailable, UnavailableKind};
use crate::shared::types::{Amount, Token};
use crate::shared::utils::{cache_key, format_units, generate_id};

/// Engine-wide knobs for the aggregator
#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    pub slippage: SlippageTolerance,
    pub cache_ttl: Duration,
    /// Used for sources without their own `timeout_ms`
    pub fetch_timeout: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            slippage: SlippageTolerance::default(),
            cache_ttl: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

impl AggregatorSettings {
    pub fn from_config(cfg: &EngineCfg) -> Result<Self, QuoteError> {
        Ok(Self {
            slippage: SlippageTolerance::from_bps(cfg.slippage_bps)?,
            cache_ttl: cfg.cache_ttl(),
            fetch_timeout: cfg.fetch_timeout(),
        })
    }
}

/// What one source produced for one request
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: String,
    pub result: Result<Quote, SourceUnavailable>,
}

/// Full picture of a fan-out: the winner plus everything that came back
#[derive(Debug, Clone)]
pub struct RouteReport {
    pub best: Quote,
    /// Successful quotes in registration order, zero outputs included
    pub quotes: Vec<Quote>,
    pub failures: Vec<SourceUnavailable>,
}

pub struct QuoteAggregator {
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn QuoteFetcher>,
    cache: QuoteCache,
    selector: RouteSelector,
    settings: AggregatorSettings,
    clock: Arc<dyn Clock>,
}

impl QuoteAggregator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        fetcher: Arc<dyn QuoteFetcher>,
        cache: QuoteCache,
        selector: RouteSelector,
        settings: AggregatorSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            cache,
            selector,
            settings,
            clock,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Best quote across all sources at the default slippage tolerance
    pub async fn aggregate(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &Amount,
    ) -> Result<SwapQuote, QuoteError> {
        self.aggregate_with_slippage(token_in, token_out, amount_in, self.settings.slippage.bps())
            .await
    }

    /// Best quote across all sources. Results are cached per
    /// (pair, amount, slippage) for the configured TTL; failures are not.
    pub async fn aggregate_with_slippage(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &Amount,
        slippage_bps: u32,
    ) -> Result<SwapQuote, QuoteError> {
        let tolerance = SlippageTolerance::from_bps(slippage_bps)?;

        let span = info_span!(
            "aggregate",
            request_id = %generate_id(),
            token_in = %token_in.symbol,
            token_out = %token_out.symbol,
            %amount_in,
            slippage_bps
        );

        async move {
            let key = Self::cache_key(token_in, token_out, amount_in, tolerance);
            self.cache
                .get_or_try_set(&key, self.settings.cache_ttl, || {
                    self.quote_uncached(token_in, token_out, amount_in, tolerance)
                })
                .await
        }
        .instrument(span)
        .await
    }

    fn cache_key(token_in: &Token, token_out: &Token, amount_in: &Amount, tolerance: SlippageTolerance) -> String {
        cache_key(&[
            "aggregate",
            &token_in.normalized_address(),
            &token_out.normalized_address(),
            &amount_in.to_string(),
            &tolerance.bps().to_string(),
        ])
    }

    async fn quote_uncached(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &Amount,
        tolerance: SlippageTolerance,
    ) -> Result<SwapQuote, QuoteError> {
        let report = self.best_route(token_in, token_out, amount_in).await?;
        let best = report.best;
        let amount_out_min = tolerance.apply(&best.amount_out);
        let cross_chain = best.chain_id != token_in.chain_id;

        info!(
            source = %best.source,
            amount_out = %format_units(&best.amount_out, token_out.decimals),
            amount_out_min = %format_units(&amount_out_min, token_out.decimals),
            cross_chain,
            "✅ Best route selected"
        );

        Ok(SwapQuote {
            amount_in: amount_in.clone(),
            amount_out_min,
            slippage_bps: tolerance.bps(),
            price_impact_bps: best.price_impact_bps,
            gas_estimate: best.gas_estimate,
            route: SwapRoute::from(&best),
            cross_chain,
            quoted_at: self.clock.now_millis(),
            amount_out: best.amount_out,
        })
    }

    /// Fan out to every source without consulting the cache and report all
    /// quotes alongside the winner
    pub async fn best_route(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &Amount,
    ) -> Result<RouteReport, QuoteError> {
        let outcomes = self.collect_quotes(token_in, token_out, amount_in).await;

        let mut quotes = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(quote) => {
                    debug!(source = %quote.source, amount_out = %quote.amount_out, "Quote received");
                    quotes.push(quote);
                }
                Err(e) => {
                    warn!(
                        source = %e.source_name,
                        kind = %e.kind,
                        detail = %e.detail,
                        "⚠️ Source unavailable"
                    );
                    failures.push(e);
                }
            }
        }

        let best = match self.selector.select(&quotes, Some(token_in.chain_id)) {
            Some(best) => best.clone(),
            None => {
                warn!(
                    sources = self.registry.len(),
                    failed = failures.len(),
                    "❌ No source returned a usable quote"
                );
                return Err(QuoteError::NoLiquidity);
            }
        };

        Ok(RouteReport {
            best,
            quotes,
            failures,
        })
    }

    /// One task per source, each bounded by its own timeout. Outcomes come
    /// back in registration order whatever order the tasks finish in.
    pub async fn collect_quotes(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &Amount,
    ) -> Vec<SourceOutcome> {
        let handles: Vec<(String, JoinHandle<Result<Quote, SourceUnavailable>>)> = self
            .registry
            .list_sources()
            .iter()
            .map(|source| {
                let handle = self.spawn_fetch(source.clone(), token_in.clone(), token_out.clone(), amount_in.clone());
                (source.name.clone(), handle)
            })
            .collect();

        info!(sources = handles.len(), "🔍 Fanning out quote requests");

        let (names, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;

        names
            .into_iter()
            .zip(joined)
            .map(|(source, joined)| {
                let result = joined.unwrap_or_else(|e| {
                    let detail = if e.is_panic() {
                        "quote task panicked".to_string()
                    } else {
                        format!("quote task cancelled: {}", e)
                    };
                    Err(SourceUnavailable::new(&source, UnavailableKind::Internal, detail))
                });
                SourceOutcome { source, result }
            })
            .collect()
    }

    fn spawn_fetch(
        &self,
        source: PriceSource,
        token_in: Token,
        token_out: Token,
        amount_in: Amount,
    ) -> JoinHandle<Result<Quote, SourceUnavailable>> {
        let fetcher = Arc::clone(&self.fetcher);
        let limit = source.timeout().unwrap_or(self.settings.fetch_timeout);

        tokio::spawn(
            async move {
                match tokio::time::timeout(limit, fetcher.fetch_quote(&source, &token_in, &token_out, &amount_in)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceUnavailable::new(
                        &source.name,
                        UnavailableKind::Timeout,
                        format!("no response within {}ms", limit.as_millis()),
                    )),
                }
            }
            .in_current_span(),
        )
    }
}
