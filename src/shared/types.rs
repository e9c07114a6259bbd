//! Common types used across the application

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// EVM chain identifier
pub type ChainId = u64;

/// Token amount in the token's smallest unit
pub type Amount = BigUint;

/// Basis-point denominator (100% = 10_000 bps)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Token representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub chain_id: ChainId,
    #[serde(default)]
    pub name: Option<String>,
}

impl Token {
    pub fn new(address: impl Into<String>, symbol: impl Into<String>, decimals: u8, chain_id: ChainId) -> Self {
        Self {
            address: address.into(),
            symbol: symbol.into(),
            decimals,
            chain_id,
            name: None,
        }
    }

    /// Lower-cased address, used for lookups and cache keys
    pub fn normalized_address(&self) -> String {
        self.address.to_lowercase()
    }
}

/// Serde adapter writing big integers as decimal strings.
///
/// JSON consumers (and the cache backends) cannot represent uint256 values
/// as numbers without losing precision.
pub mod amount_serde {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigUint::from_str(&s).map_err(|e| D::Error::custom(format!("invalid amount {:?}: {}", s, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "amount_serde")]
        value: Amount,
    }

    #[test]
    fn test_amount_serialized_as_string() {
        let w = Wrapper {
            value: BigUint::from(10u32).pow(30),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"value":"1000000000000000000000000000000"}"#);
    }

    #[test]
    fn test_amount_rejects_garbage() {
        let parsed: Result<Wrapper, _> = serde_json::from_str(r#"{"value":"12ab"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_normalized_address() {
        let token = Token::new("0xB8fa87a1dAC07e077a51999F5cE79BD236f06acf", "USDT", 18, 65001);
        assert_eq!(token.normalized_address(), "0xb8fa87a1dac07e077a51999f5ce79bd236f06acf");
    }
}
