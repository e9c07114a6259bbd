//! Utility functions and helpers

use num_bigint::BigUint;
use num_traits::Zero;
use std::str::FromStr;

use crate::shared::errors::{AbiError, QuoteError};

/// Convert a human-readable decimal string into smallest units.
///
/// `"1.5"` with 6 decimals becomes `1_500_000`. Fractional digits beyond the
/// token's precision are rejected unless they are trailing zeros.
pub fn parse_units(amount: &str, decimals: u8) -> Result<BigUint, QuoteError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(QuoteError::InvalidAmount("amount is empty".to_string()));
    }
    if amount.starts_with('-') {
        return Err(QuoteError::InvalidAmount(format!("negative amount: {}", amount)));
    }

    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(QuoteError::InvalidAmount(format!("not a number: {}", amount)));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(QuoteError::InvalidAmount(format!("not a number: {}", amount)));
    }

    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.len() > decimals as usize {
        return Err(QuoteError::InvalidAmount(format!(
            "{} has more than {} fractional digits",
            amount, decimals
        )));
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..decimals as usize {
        digits.push('0');
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }

    BigUint::from_str(digits).map_err(|e| QuoteError::InvalidAmount(format!("{}: {}", amount, e)))
}

/// Format smallest units as a decimal string (`2_050_000`, 6 -> `"2.05"`)
pub fn format_units(amount: &BigUint, decimals: u8) -> String {
    let raw = amount.to_str_radix(10);
    if decimals == 0 {
        return raw;
    }

    let decimals = decimals as usize;
    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - raw.len()), raw)
    } else {
        raw
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        format!("{}.0", int_part)
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Parse a 0x-prefixed 20-byte hex address
pub fn parse_address(address: &str) -> Result<[u8; 20], AbiError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    if hex_part.len() != 40 {
        return Err(AbiError::InvalidAddress(address.to_string()));
    }

    let bytes = hex::decode(hex_part).map_err(|_| AbiError::InvalidAddress(address.to_string()))?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Join key parts with `:`
pub fn cache_key(parts: &[&str]) -> String {
    parts.join(":")
}

/// Generate unique ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
