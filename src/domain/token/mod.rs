//! Token metadata lookup

use async_trait::async_trait;
use std::collections::HashMap;

use crate::shared::types::{ChainId, Token};

/// Resolves token metadata (decimals, symbol) for an address
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    async fn resolve(&self, chain_id: ChainId, address: &str) -> Option<Token>;
}

/// In-memory registry loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticTokenRegistry {
    tokens: HashMap<(ChainId, String), Token>,
}

impl StaticTokenRegistry {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .map(|t| ((t.chain_id, t.normalized_address()), t))
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenRegistry for StaticTokenRegistry {
    async fn resolve(&self, chain_id: ChainId, address: &str) -> Option<Token> {
        self.tokens.get(&(chain_id, address.to_lowercase())).cloned()
    }
}
