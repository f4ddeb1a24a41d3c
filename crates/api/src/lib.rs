//! Price history API clients for external indexes.
//!
//! This crate provides:
//! - The [`PairIndex`] capability: liquidity-ranked pools for a token
//! - A Uniswap V2 subgraph implementation of it

mod error;
mod subgraph;

pub use error::IndexError;
pub use subgraph::{rank_candidates, UniswapV2SubgraphClient, DEFAULT_PAIRS_PER_SIDE};

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A pool containing a token, with its USD liquidity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolCandidate {
    pub pool: Address,
    pub token0: Address,
    pub token1: Address,
    /// Total reserves in USD as reported by the index
    pub reserve_usd: f64,
}

impl PoolCandidate {
    /// The other constituent of the pool.
    pub fn counter_asset(&self, token: Address) -> Option<Address> {
        if token == self.token0 {
            Some(self.token1)
        } else if token == self.token1 {
            Some(self.token0)
        } else {
            None
        }
    }
}

/// Liquidity index over two-asset pools.
#[async_trait]
pub trait PairIndex: Send + Sync {
    /// Pools where `token` is either constituent, highest `reserve_usd` first.
    async fn top_pools_for_token(&self, token: Address) -> Result<Vec<PoolCandidate>, IndexError>;
}
