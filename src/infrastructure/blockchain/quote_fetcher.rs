//! Router-backed quote fetcher

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::router_call::RouterCall;
use super::rpc_client::EvmRpcClient;
use crate::domain::dex::{PriceSource, QuoteFetcher};
use crate::domain::quote::Quote;
use crate::shared::clock::Clock;
use crate::shared::errors::{AppError, SourceUnavailable, UnavailableKind};
use crate::shared::types::{Amount, Token};

/// Quotes the direct `[token_in, token_out]` path through each source's router.
///
/// Multi-hop routing (e.g. through a wrapped native token) would extend the
/// path built in `fetch_quote`; `RouterCall` already encodes paths of any length.
pub struct RouterQuoteFetcher {
    rpc: EvmRpcClient,
    clock: Arc<dyn Clock>,
}

impl RouterQuoteFetcher {
    /// `default_timeout` bounds calls to sources without their own `timeout_ms`
    pub fn new(default_timeout: Duration, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        Ok(Self {
            rpc: EvmRpcClient::new(default_timeout)?,
            clock,
        })
    }
}

#[async_trait]
impl QuoteFetcher for RouterQuoteFetcher {
    async fn fetch_quote(
        &self,
        source: &PriceSource,
        token_in: &Token,
        token_out: &Token,
        amount_in: &Amount,
    ) -> Result<Quote, SourceUnavailable> {
        let unavailable = |kind: UnavailableKind, detail: String| SourceUnavailable::new(&source.name, kind, detail);

        let path = vec![token_in.address.clone(), token_out.address.clone()];
        let call = RouterCall::amounts_out(source.kind, amount_in, &path)
            .map_err(|e| unavailable(UnavailableKind::Internal, e.to_string()))?;
        let calldata = call
            .encode()
            .map_err(|e| unavailable(UnavailableKind::Internal, e.to_string()))?;

        debug!(
            source = %source.name,
            chain_id = source.chain_id,
            router_kind = source.kind.as_str(),
            token_in = %token_in.symbol,
            token_out = %token_out.symbol,
            %amount_in,
            "🔍 Requesting getAmountsOut"
        );

        let raw = self
            .rpc
            .eth_call(&source.rpc_url, &source.router, &calldata, source.timeout())
            .await
            .map_err(|e| unavailable(e.kind(), e.to_string()))?;

        let amounts = call
            .decode_output(&raw)
            .map_err(|e| unavailable(UnavailableKind::MalformedResponse, e.to_string()))?;
        if amounts.len() < path.len() {
            return Err(unavailable(
                UnavailableKind::MalformedResponse,
                format!("expected {} amounts, got {}", path.len(), amounts.len()),
            ));
        }
        let amount_out = amounts
            .last()
            .cloned()
            .ok_or_else(|| unavailable(UnavailableKind::MalformedResponse, "empty amounts".to_string()))?;

        Ok(Quote {
            source: source.name.clone(),
            chain_id: source.chain_id,
            router: source.router.clone(),
            path,
            amount_out,
            gas_estimate: source.gas_estimate,
            price_impact_bps: source.price_impact_bps,
            timestamp: self.clock.now_millis(),
        })
    }
}

/// Canned per-source responses for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        Quote(Amount),
        Fail(UnavailableKind),
        /// Never resolves; only the caller's timeout ends it
        Hang,
        Panic,
    }

    #[derive(Debug, Default)]
    pub struct MockQuoteFetcher {
        behaviors: RwLock<HashMap<String, MockBehavior>>,
        calls: AtomicUsize,
    }

    impl MockQuoteFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(self, source: &str, behavior: MockBehavior) -> Self {
            self.set(source, behavior);
            self
        }

        pub fn set(&self, source: &str, behavior: MockBehavior) {
            if let Ok(mut behaviors) = self.behaviors.write() {
                behaviors.insert(source.to_string(), behavior);
            }
        }

        /// Total fetch_quote invocations
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteFetcher for MockQuoteFetcher {
        async fn fetch_quote(
            &self,
            source: &PriceSource,
            token_in: &Token,
            token_out: &Token,
            _amount_in: &Amount,
        ) -> Result<Quote, SourceUnavailable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let behavior = self
                .behaviors
                .read()
                .ok()
                .and_then(|b| b.get(&source.name).cloned())
                .unwrap_or(MockBehavior::Fail(UnavailableKind::Network));

            match behavior {
                MockBehavior::Quote(amount_out) => Ok(Quote {
                    source: source.name.clone(),
                    chain_id: source.chain_id,
                    router: source.router.clone(),
                    path: vec![token_in.address.clone(), token_out.address.clone()],
                    amount_out,
                    gas_estimate: source.gas_estimate,
                    price_impact_bps: source.price_impact_bps,
                    timestamp: 0,
                }),
                MockBehavior::Fail(kind) => Err(SourceUnavailable::new(&source.name, kind, "mock failure")),
                MockBehavior::Hang => {
                    std::future::pending::<()>().await;
                    Err(SourceUnavailable::new(&source.name, UnavailableKind::Timeout, "unreachable"))
                }
                MockBehavior::Panic => panic!("mock source {} panicked", source.name),
            }
        }
    }
}
