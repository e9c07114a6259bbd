//! Error handling for the application

use std::fmt;
use thiserror::Error;

use crate::shared::types::ChainId;

/// Errors surfaced to callers of the quote engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("Token not found: {address} on chain {chain_id}")]
    TokenNotFound { chain_id: ChainId, address: String },

    #[error("No liquidity: no source returned a usable quote")]
    NoLiquidity,

    #[error("Invalid slippage tolerance: {0} bps (must be below 10000)")]
    InvalidSlippage(u32),

    #[error("Rate limited on {endpoint}, retry in {retry_after_ms}ms")]
    RateLimited { endpoint: String, retry_after_ms: u64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Why a single source could not produce a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableKind {
    Network,
    Rpc,
    MalformedResponse,
    Timeout,
    Internal,
}

impl fmt::Display for UnavailableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnavailableKind::Network => "network error",
            UnavailableKind::Rpc => "rpc error",
            UnavailableKind::MalformedResponse => "malformed response",
            UnavailableKind::Timeout => "timeout",
            UnavailableKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// A source failed to quote. Absorbed by the aggregator, never returned to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Source {source_name} unavailable ({kind}): {detail}")]
pub struct SourceUnavailable {
    pub source_name: String,
    pub kind: UnavailableKind,
    pub detail: String,
}

impl SourceUnavailable {
    pub fn new(source_name: impl Into<String>, kind: UnavailableKind, detail: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// Router call encoding/decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("Value does not fit in uint256")]
    ValueTooLarge,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Response too short: need {expected} bytes, got {actual}")]
    ResponseTooShort { expected: usize, actual: usize },

    #[error("Invalid offset or length in response: {0}")]
    InvalidLayout(String),
}

/// Cache backing-store errors. Never propagated past the quote cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend unreachable: {0}")]
    Unreachable(String),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Blockchain error: {0}")]
    BlockchainError(String),

    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<SourceUnavailable> for AppError {
    fn from(err: SourceUnavailable) -> Self {
        AppError::BlockchainError(err.to_string())
    }
}

impl From<AbiError> for AppError {
    fn from(err: AbiError) -> Self {
        AppError::BlockchainError(err.to_string())
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Unknown(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::ConfigError(format!("{:#}", err))
    }
}

/// JSON-RPC transport and protocol errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// How this failure is reported when it takes a source offline
    pub fn kind(&self) -> UnavailableKind {
        match self {
            RpcError::Transport(e) if e.is_timeout() => UnavailableKind::Timeout,
            RpcError::Transport(_) | RpcError::Status(_) => UnavailableKind::Network,
            RpcError::Rpc { .. } => UnavailableKind::Rpc,
            RpcError::InvalidResponse(_) => UnavailableKind::MalformedResponse,
        }
    }
}
