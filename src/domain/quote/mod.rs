//! Quote domain - per-source offers, aggregated results and the pure
//! selection / slippage logic applied to them

mod route_selector;
mod slippage;

pub use route_selector::{select_best, RoutePolicy, RouteSelector};
pub use slippage::{compute_min_out, SlippageTolerance, DEFAULT_SLIPPAGE_BPS};

use serde::{Deserialize, Serialize};

use crate::shared::types::{amount_serde, Amount, ChainId};

/// One source's offer for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub source: String,
    pub chain_id: ChainId,
    pub router: String,
    /// Token addresses the swap passes through, input first
    pub path: Vec<String>,
    #[serde(with = "amount_serde")]
    pub amount_out: Amount,
    pub gas_estimate: u64,
    pub price_impact_bps: u32,
    /// Unix millis
    pub timestamp: i64,
}

/// Where a recommended swap executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub source: String,
    pub chain_id: ChainId,
    pub router: String,
    pub path: Vec<String>,
}

/// Aggregated result handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    #[serde(with = "amount_serde")]
    pub amount_in: Amount,
    #[serde(with = "amount_serde")]
    pub amount_out: Amount,
    /// Guaranteed minimum after slippage, always <= amount_out
    #[serde(with = "amount_serde")]
    pub amount_out_min: Amount,
    pub slippage_bps: u32,
    pub price_impact_bps: u32,
    pub gas_estimate: u64,
    pub route: SwapRoute,
    /// Winning source is not on the input token's chain
    pub cross_chain: bool,
    /// Unix millis
    pub quoted_at: i64,
}

impl From<&Quote> for SwapRoute {
    fn from(quote: &Quote) -> Self {
        Self {
            source: quote.source.clone(),
            chain_id: quote.chain_id,
            router: quote.router.clone(),
            path: quote.path.clone(),
        }
    }
}
