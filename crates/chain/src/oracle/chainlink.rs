//! Chainlink feed reads at historical blocks.

use alloy::primitives::{Address, I256};
use std::sync::Arc;

use super::FeedRound;
use crate::contracts::IAggregatorV3;
use crate::{call_typed, ChainError, ChainReader, Network, RetryPolicy};

/// Chainlink aggregator read at a chosen block.
#[derive(Clone)]
pub struct ChainlinkFeed {
    /// Aggregator contract address
    aggregator: Address,
    /// Answer decimals
    decimals: u8,
    reader: Arc<dyn ChainReader>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ChainlinkFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainlinkFeed")
            .field("aggregator", &self.aggregator)
            .field("decimals", &self.decimals)
            .finish()
    }
}

impl ChainlinkFeed {
    /// Create a feed reader.
    pub fn new(
        aggregator: Address,
        decimals: u8,
        reader: Arc<dyn ChainReader>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            aggregator,
            decimals,
            reader,
            retry,
        }
    }

    /// Aggregator address.
    pub fn address(&self) -> Address {
        self.aggregator
    }

    /// Latest round as of `block`, normalized to USD.
    pub async fn round_at(&self, network: Network, block: u64) -> Result<FeedRound, ChainError> {
        let round = self
            .retry
            .run_chain("latestRoundData", || {
                call_typed(
                    self.reader.as_ref(),
                    network,
                    self.aggregator,
                    &IAggregatorV3::latestRoundDataCall {},
                    block,
                )
            })
            .await?
            .ok_or(ChainError::OracleUnavailable {
                feed: self.aggregator,
                block,
            })?;

        let price = normalize_answer(round.answer, self.decimals).ok_or_else(|| {
            ChainError::InvalidOracleAnswer {
                feed: self.aggregator,
                answer: round.answer.to_string(),
            }
        })?;

        Ok(FeedRound {
            price,
            updated_at: round.updatedAt.saturating_to::<u64>(),
        })
    }
}

/// Convert a signed fixed-point answer to a float; `None` unless positive.
pub fn normalize_answer(answer: I256, decimals: u8) -> Option<f64> {
    if !answer.is_positive() {
        return None;
    }
    let raw = answer.into_raw().to_string().parse::<f64>().ok()?;
    Some(raw / 10_f64.powi(decimals as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn test_normalize_answer() {
        // $2000 with 8 decimals
        let answer = I256::from_raw(U256::from(200_000_000_000u64));
        let price = normalize_answer(answer, 8).unwrap();
        assert!((price - 2000.0).abs() < 1e-9);

        assert!(normalize_answer(I256::ZERO, 8).is_none());
        assert!(normalize_answer(I256::MINUS_ONE, 8).is_none());
    }
}
