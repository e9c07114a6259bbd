//! Quote Router - cross-DEX swap quote aggregation
//! Built with Domain-Driven Design principles
//!
//! Queries every configured exchange router in parallel, picks the best
//! output and bounds it with an integer slippage floor. Results are cached
//! briefly and the public entry point sits behind a fixed-window rate limiter.

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod shared;

// Re-export main types for convenience
pub use application::{QuoteAggregator, QuoteService};
pub use domain::dex::{PriceSource, QuoteFetcher, SourceRegistry};
pub use domain::quote::{Quote, RouteSelector, SlippageTolerance, SwapQuote};
pub use infrastructure::cache::{CacheBackend, QuoteCache};
pub use infrastructure::rate_limit::RateLimiter;
pub use shared::config::EngineConfig;
pub use shared::errors::{AppError, QuoteError};
