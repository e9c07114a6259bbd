//! Registry of the exchange venues quotes are requested from

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::types::ChainId;

/// Router call shapes we know how to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterKind {
    /// Uniswap-V2-style router exposing `getAmountsOut(uint256,address[])`
    #[default]
    UniswapV2,
}

impl RouterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouterKind::UniswapV2 => "uniswap_v2",
        }
    }
}

fn default_gas_estimate() -> u64 {
    150_000
}

fn default_price_impact_bps() -> u32 {
    50
}

/// One exchange venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSource {
    pub name: String,
    pub chain_id: ChainId,
    pub router: String,
    pub rpc_url: String,
    #[serde(default)]
    pub kind: RouterKind,
    /// Static gas estimate for a swap through this router
    #[serde(default = "default_gas_estimate")]
    pub gas_estimate: u64,
    /// Static price impact placeholder, in basis points
    #[serde(default = "default_price_impact_bps")]
    pub price_impact_bps: u32,
    /// Overrides the engine-wide per-source timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl PriceSource {
    pub fn new(name: impl Into<String>, chain_id: ChainId, router: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain_id,
            router: router.into(),
            rpc_url: rpc_url.into(),
            kind: RouterKind::UniswapV2,
            gas_estimate: default_gas_estimate(),
            price_impact_bps: default_price_impact_bps(),
            timeout_ms: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Immutable, ordered list of venues. Registration order breaks routing ties.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<PriceSource>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<PriceSource>) -> Self {
        Self { sources }
    }

    /// All sources in registration order
    pub fn list_sources(&self) -> &[PriceSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Production venues
    pub fn default_sources() -> Vec<PriceSource> {
        vec![
            PriceSource::new(
                "NorSwap",
                65001,
                "0xbe0d0ec34A93a2Ec08492715a51C613B7E530D80",
                "https://rpc.norchain.org",
            ),
            PriceSource::new(
                "PancakeSwap",
                56,
                "0x10ED43C718714eb63d5aA57B78B54704E256024E",
                "https://bsc-dataseed1.binance.org",
            ),
            PriceSource::new(
                "Uniswap V2",
                1,
                "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D",
                "https://eth.llamarpc.com",
            ),
            PriceSource::new(
                "QuickSwap",
                137,
                "0xa5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff",
                "https://polygon-rpc.com",
            ),
        ]
    }
}
