//! Quote fetcher trait

use async_trait::async_trait;

use super::PriceSource;
use crate::domain::quote::Quote;
use crate::shared::errors::SourceUnavailable;
use crate::shared::types::{Amount, Token};

/// Issues one read-only quote call against one source.
///
/// Implementations must turn every failure into `SourceUnavailable`; panics
/// and hangs are contained by the aggregator.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch_quote(
        &self,
        source: &PriceSource,
        token_in: &Token,
        token_out: &Token,
        amount_in: &Amount,
    ) -> Result<Quote, SourceUnavailable>;
}
