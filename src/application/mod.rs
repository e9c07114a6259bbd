//! Application layer - use cases and services

pub mod aggregator;
pub mod services;

pub use aggregator::{AggregatorSettings, QuoteAggregator, RouteReport, SourceOutcome};
pub use services::{QuoteService, QuoteServiceBuilder};
