use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use tracing::warn;

use crate::domain::dex::{PriceSource, SourceRegistry};
use crate::domain::quote::RoutePolicy;
use crate::shared::types::{Token, BPS_DENOMINATOR};
use crate::shared::utils::parse_address;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineCfg {
    /// Default slippage tolerance in basis points
    pub slippage_bps: u32,
    pub cache_ttl_secs: u64,
    /// Per-source timeout for a single quote call
    pub fetch_timeout_ms: u64,
    pub route_policy: RoutePolicy,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            slippage_bps: 200,
            cache_ttl_secs: 5,
            fetch_timeout_ms: 5_000,
            route_policy: RoutePolicy::BestOutput,
        }
    }
}

impl EngineCfg {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheCfg {
    pub max_entries: usize,
    /// 0 disables the background sweeper (lazy expiry only)
    pub sweep_interval_secs: u64,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitCfg {
    pub endpoint: String,
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitCfg {
    fn default() -> Self {
        Self {
            endpoint: "swap_quote".to_string(),
            max_requests: 30,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineCfg,
    #[serde(default)]
    pub cache: CacheCfg,
    #[serde(default)]
    pub rate_limit: RateLimitCfg,
    #[serde(default = "SourceRegistry::default_sources")]
    pub sources: Vec<PriceSource>,
    #[serde(default = "default_tokens")]
    pub tokens: Vec<Token>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: EngineCfg::default(),
            cache: CacheCfg::default(),
            rate_limit: RateLimitCfg::default(),
            sources: SourceRegistry::default_sources(),
            tokens: default_tokens(),
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parse Config.toml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.slippage_bps >= BPS_DENOMINATOR {
            bail!("engine.slippage_bps must be below {}, got {}", BPS_DENOMINATOR, self.engine.slippage_bps);
        }
        if self.engine.fetch_timeout_ms == 0 {
            bail!("engine.fetch_timeout_ms must be positive");
        }
        if !(5..=10).contains(&self.engine.cache_ttl_secs) {
            warn!(
                cache_ttl_secs = self.engine.cache_ttl_secs,
                "Cache TTL outside the recommended 5-10s window"
            );
        }
        if self.rate_limit.window_secs == 0 {
            bail!("rate_limit.window_secs must be positive");
        }
        if self.sources.is_empty() {
            bail!("at least one [[sources]] entry is required");
        }
        for source in &self.sources {
            parse_address(&source.router)
                .with_context(|| format!("source {} router address", source.name))?;
            if source.rpc_url.is_empty() {
                bail!("source {} has an empty rpc_url", source.name);
            }
        }
        for token in &self.tokens {
            parse_address(&token.address)
                .with_context(|| format!("token {} address", token.symbol))?;
        }
        Ok(())
    }
}

/// Tokens listed on the NorChain DEX
fn default_tokens() -> Vec<Token> {
    const NORCHAIN: u64 = 65001;
    [
        ("0x26c0eaF731885b14c031cc50dB79b36458E0b355", "WNOR"),
        ("0xB8fa87a1dAC07e077a51999F5cE79BD236f06acf", "USDT"),
        ("0xa4cBBcbd8146482E5618c833faFf5fA4C29B78a6", "BNB"),
        ("0xc6E0cD72723C9409ba221197e06830EB928a7A76", "ETH"),
        ("0x24719ba3b4AD49cC7edcbDc536fd97C8526830A0", "XHN"),
        ("0x0cF8e180350253271f4b917CcFb0aCCc4862F262", "BTCBR"),
    ]
    .into_iter()
    .map(|(address, symbol)| Token::new(address, symbol, 18, NORCHAIN))
    .collect()
}
