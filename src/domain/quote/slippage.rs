//! Slippage protection on arbitrary-precision integers

use crate::shared::errors::QuoteError;
use crate::shared::types::{Amount, BPS_DENOMINATOR};

/// 2%
pub const DEFAULT_SLIPPAGE_BPS: u32 = 200;

/// Validated slippage tolerance in basis points, always below 10_000
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlippageTolerance(u32);

impl SlippageTolerance {
    pub fn from_bps(bps: u32) -> Result<Self, QuoteError> {
        if bps >= BPS_DENOMINATOR {
            return Err(QuoteError::InvalidSlippage(bps));
        }
        Ok(Self(bps))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// `floor(amount_out * (10000 - bps) / 10000)`
    pub fn apply(&self, amount_out: &Amount) -> Amount {
        amount_out * (BPS_DENOMINATOR - self.0) / BPS_DENOMINATOR
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self(DEFAULT_SLIPPAGE_BPS)
    }
}

/// Minimum acceptable output for `amount_out` under `tolerance_bps`
pub fn compute_min_out(amount_out: &Amount, tolerance_bps: u32) -> Result<Amount, QuoteError> {
    Ok(SlippageTolerance::from_bps(tolerance_bps)?.apply(amount_out))
}
