//! Infrastructure layer - RPC access, caching and rate limiting

pub mod blockchain;
pub mod cache;
pub mod rate_limit;

pub use rate_limit::{RateLimitDecision, RateLimitWindow, RateLimiter};
