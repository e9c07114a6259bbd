//! EVM router access for quote fetching

pub mod quote_fetcher;
pub mod router_call;
pub mod rpc_client;

pub use quote_fetcher::RouterQuoteFetcher;
pub use router_call::{RouterCall, GET_AMOUNTS_OUT_SELECTOR};
pub use rpc_client::EvmRpcClient;

#[cfg(any(test, feature = "test-utils"))]
pub use quote_fetcher::mock::{MockBehavior, MockQuoteFetcher};
