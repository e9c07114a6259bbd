//! Best-route selection over the quotes that survived fan-out

use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::Quote;
use crate::shared::types::ChainId;

/// How competing quotes are ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePolicy {
    /// Highest `amount_out` wins
    #[default]
    BestOutput,
    /// Sources on the input token's chain beat cross-chain sources, then
    /// highest `amount_out`. Bridging cost is not modelled.
    PreferSameChain,
}

/// Highest-output quote. Zero-output quotes never win; on exact ties the
/// earliest quote in `quotes` (registration order) is kept.
pub fn select_best(quotes: &[Quote]) -> Option<&Quote> {
    RouteSelector::new(RoutePolicy::BestOutput).select(quotes, None)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouteSelector {
    policy: RoutePolicy,
}

impl RouteSelector {
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RoutePolicy {
        self.policy
    }

    /// `origin_chain` is the input token's chain, only consulted by
    /// `PreferSameChain`.
    pub fn select<'a>(&self, quotes: &'a [Quote], origin_chain: Option<ChainId>) -> Option<&'a Quote> {
        let mut best: Option<&Quote> = None;
        for quote in quotes.iter().filter(|q| !q.amount_out.is_zero()) {
            best = match best {
                None => Some(quote),
                Some(current) if self.beats(quote, current, origin_chain) => Some(quote),
                keep => keep,
            };
        }
        best
    }

    /// Strictly better, so ties keep the incumbent
    fn beats(&self, challenger: &Quote, incumbent: &Quote, origin_chain: Option<ChainId>) -> bool {
        if let (RoutePolicy::PreferSameChain, Some(chain)) = (self.policy, origin_chain) {
            let challenger_local = challenger.chain_id == chain;
            let incumbent_local = incumbent.chain_id == chain;
            if challenger_local != incumbent_local {
                return challenger_local;
            }
        }
        challenger.amount_out > incumbent.amount_out
    }
}
