//! DEX domain - exchange venues and the quote fetcher seam

mod dex_interface;
mod dex_registry;

pub use dex_interface::QuoteFetcher;
pub use dex_registry::{PriceSource, RouterKind, SourceRegistry};
