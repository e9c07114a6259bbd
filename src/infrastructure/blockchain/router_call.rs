//! Router call shapes and their ABI encoding
//!
//! Only the `getAmountsOut(uint256,address[])` view of Uniswap-V2-style
//! routers is supported. Encoding is done by hand: one static word, one
//! dynamic array.

use num_bigint::BigUint;

use crate::domain::dex::RouterKind;
use crate::shared::errors::AbiError;
use crate::shared::types::Amount;
use crate::shared::utils::parse_address;

/// `bytes4(keccak256("getAmountsOut(uint256,address[])"))`
pub const GET_AMOUNTS_OUT_SELECTOR: [u8; 4] = [0xd0, 0x6c, 0xa6, 0x1f];

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterCall {
    GetAmountsOut { amount_in: Amount, path: Vec<[u8; 20]> },
}

impl RouterCall {
    /// Build the "amounts out" call for the given router kind
    pub fn amounts_out(kind: RouterKind, amount_in: &Amount, path: &[String]) -> Result<Self, AbiError> {
        let path = path
            .iter()
            .map(|addr| parse_address(addr))
            .collect::<Result<Vec<_>, _>>()?;

        match kind {
            RouterKind::UniswapV2 => Ok(RouterCall::GetAmountsOut {
                amount_in: amount_in.clone(),
                path,
            }),
        }
    }

    /// Calldata for `eth_call`
    pub fn encode(&self) -> Result<Vec<u8>, AbiError> {
        match self {
            RouterCall::GetAmountsOut { amount_in, path } => {
                let mut out = Vec::with_capacity(4 + WORD * (3 + path.len()));
                out.extend_from_slice(&GET_AMOUNTS_OUT_SELECTOR);
                out.extend_from_slice(&encode_uint(amount_in)?);
                // head: offset of the dynamic array, right after the two head words
                out.extend_from_slice(&encode_usize(2 * WORD));
                out.extend_from_slice(&encode_usize(path.len()));
                for address in path {
                    let mut word = [0u8; WORD];
                    word[12..].copy_from_slice(address);
                    out.extend_from_slice(&word);
                }
                Ok(out)
            }
        }
    }

    /// Decode the returned `uint256[]`
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Amount>, AbiError> {
        match self {
            RouterCall::GetAmountsOut { .. } => decode_uint_array(data),
        }
    }
}

fn encode_uint(value: &BigUint) -> Result<[u8; WORD], AbiError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > WORD {
        return Err(AbiError::ValueTooLarge);
    }
    let mut word = [0u8; WORD];
    word[WORD - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn encode_usize(n: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(n as u64).to_be_bytes());
    word
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset
        .checked_add(WORD)
        .ok_or_else(|| AbiError::InvalidLayout(format!("offset {} overflows", offset)))?;
    data.get(offset..end).ok_or(AbiError::ResponseTooShort {
        expected: end,
        actual: data.len(),
    })
}

fn word_to_usize(word: &[u8]) -> Result<usize, AbiError> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidLayout("offset or length exceeds u64".to_string()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(buf))
        .map_err(|_| AbiError::InvalidLayout("offset or length exceeds usize".to_string()))
}

fn decode_uint_array(data: &[u8]) -> Result<Vec<Amount>, AbiError> {
    let offset = word_to_usize(read_word(data, 0)?)?;
    let len = word_to_usize(read_word(data, offset)?)?;

    let body_start = offset + WORD;
    let body_len = len
        .checked_mul(WORD)
        .ok_or_else(|| AbiError::InvalidLayout(format!("array length {} overflows", len)))?;
    let expected = body_start
        .checked_add(body_len)
        .ok_or_else(|| AbiError::InvalidLayout(format!("array length {} overflows", len)))?;
    if data.len() < expected {
        return Err(AbiError::ResponseTooShort {
            expected,
            actual: data.len(),
        });
    }

    (0..len)
        .map(|i| read_word(data, body_start + i * WORD).map(BigUint::from_bytes_be))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WNOR: &str = "0x26c0eaF731885b14c031cc50dB79b36458E0b355";
    const USDT: &str = "0xB8fa87a1dAC07e077a51999F5cE79BD236f06acf";

    fn uint_array_response(values: &[u64]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&encode_usize(WORD));
        out.extend_from_slice(&encode_usize(values.len()));
        for v in values {
            out.extend_from_slice(&encode_uint(&BigUint::from(*v)).unwrap());
        }
        out
    }

    #[test]
    fn test_encode_get_amounts_out() {
        let amount_in = BigUint::from(1_000_000_000_000_000_000u64);
        let call = RouterCall::amounts_out(
            RouterKind::UniswapV2,
            &amount_in,
            &[WNOR.to_string(), USDT.to_string()],
        )
        .unwrap();
        let data = call.encode().unwrap();

        assert_eq!(data.len(), 4 + 5 * WORD);
        assert_eq!(&data[..4], &GET_AMOUNTS_OUT_SELECTOR);
        assert_eq!(
            hex::encode(&data[4..36]),
            "0000000000000000000000000000000000000000000000000de0b6b3a7640000"
        );
        assert_eq!(data[4 + 2 * WORD - 1], 0x40);
        assert_eq!(data[4 + 3 * WORD - 1], 2);
        assert_eq!(
            hex::encode(&data[4 + 3 * WORD..4 + 4 * WORD]),
            "00000000000000000000000026c0eaf731885b14c031cc50db79b36458e0b355"
        );
    }

    #[test]
    fn test_encode_rejects_oversized_amount() {
        let call = RouterCall::GetAmountsOut {
            amount_in: BigUint::from(2u32).pow(256),
            path: vec![[0u8; 20], [1u8; 20]],
        };
        assert_eq!(call.encode(), Err(AbiError::ValueTooLarge));
    }

    #[test]
    fn test_bad_path_address() {
        let result = RouterCall::amounts_out(
            RouterKind::UniswapV2,
            &BigUint::from(1u32),
            &["native".to_string(), USDT.to_string()],
        );
        assert!(matches!(result, Err(AbiError::InvalidAddress(_))));
    }

    #[test]
    fn test_decode_amounts() {
        let call = RouterCall::GetAmountsOut {
            amount_in: BigUint::from(1u32),
            path: vec![],
        };
        let amounts = call
            .decode_output(&uint_array_response(&[1_000, 2_050_000]))
            .unwrap();
        assert_eq!(amounts, vec![BigUint::from(1_000u32), BigUint::from(2_050_000u32)]);
    }

    #[test]
    fn test_decode_truncated_response() {
        let call = RouterCall::GetAmountsOut {
            amount_in: BigUint::from(1u32),
            path: vec![],
        };
        let mut response = uint_array_response(&[1_000, 2_050_000]);
        response.truncate(response.len() - 1);
        assert!(matches!(
            call.decode_output(&response),
            Err(AbiError::ResponseTooShort { .. })
        ));
        assert!(call.decode_output(&[]).is_err());
    }

    #[test]
    fn test_decode_absurd_length() {
        let call = RouterCall::GetAmountsOut {
            amount_in: BigUint::from(1u32),
            path: vec![],
        };
        let mut response = Vec::new();
        response.extend_from_slice(&encode_usize(WORD));
        response.extend_from_slice(&[0xff; WORD]);
        assert!(matches!(call.decode_output(&response), Err(AbiError::InvalidLayout(_))));
    }
}
