//! Pricing type definitions.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::ChainError;

/// Kind of counter-asset a token is quoted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PairedType {
    /// The network's wrapped native asset (WETH, WMATIC)
    #[serde(rename = "WETH", alias = "weth")]
    Weth,
    /// The network's USD-stable reference asset
    #[serde(rename = "USDC", alias = "usdc")]
    Usdc,
    /// Anything else; cannot be priced without multi-hop routing
    #[serde(rename = "other")]
    Other,
}

/// Reference assets and the native/USD feed for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceAssets {
    /// USD-stable asset (USDC)
    pub usd_stable: Address,
    pub usd_stable_decimals: u8,
    /// Wrapped native asset (WETH, WMATIC)
    pub wrapped_native: Address,
    pub wrapped_native_decimals: u8,
    /// Chainlink native/USD aggregator
    pub native_usd_feed: Address,
    /// Feed answer decimals (8 for Chainlink USD feeds)
    pub feed_decimals: u8,
}

impl ReferenceAssets {
    /// Classify a counter-asset.
    pub fn classify(&self, asset: Address) -> PairedType {
        if asset == self.usd_stable {
            PairedType::Usdc
        } else if asset == self.wrapped_native {
            PairedType::Weth
        } else {
            PairedType::Other
        }
    }

    /// Decimals of a reference asset.
    pub fn decimals_of(&self, paired: PairedType) -> Option<u8> {
        match paired {
            PairedType::Usdc => Some(self.usd_stable_decimals),
            PairedType::Weth => Some(self.wrapped_native_decimals),
            PairedType::Other => None,
        }
    }
}

/// Reserves of a two-asset pair at some block, in on-chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    pub pool: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: u128,
    pub reserve1: u128,
}

impl PairReserves {
    /// Counter-asset of `token` in this pair.
    pub fn counter_asset(&self, token: Address) -> Result<Address, ChainError> {
        if token == self.token0 {
            Ok(self.token1)
        } else if token == self.token1 {
            Ok(self.token0)
        } else {
            Err(ChainError::TokenNotInPool {
                token,
                pool: self.pool,
            })
        }
    }

    /// Raw reserves oriented as `(token_reserve, paired_reserve)`.
    pub fn oriented(&self, token: Address) -> Result<(u128, u128), ChainError> {
        if token == self.token0 {
            Ok((self.reserve0, self.reserve1))
        } else if token == self.token1 {
            Ok((self.reserve1, self.reserve0))
        } else {
            Err(ChainError::TokenNotInPool {
                token,
                pool: self.pool,
            })
        }
    }

    /// Units of paired asset per whole unit of `token`, decimals-adjusted.
    pub fn price_in_paired(
        &self,
        token: Address,
        token_decimals: u8,
        paired_decimals: u8,
        block: u64,
    ) -> Result<f64, ChainError> {
        let (token_reserve, paired_reserve) = self.oriented(token)?;
        if token_reserve == 0 {
            return Err(ChainError::EmptyReserves {
                pool: self.pool,
                block,
            });
        }

        let token_amount = scale(token_reserve, token_decimals);
        let paired_amount = scale(paired_reserve, paired_decimals);
        Ok(paired_amount / token_amount)
    }
}

/// Convert a raw integer amount to a float with `decimals` applied.
pub fn scale(raw: u128, decimals: u8) -> f64 {
    raw as f64 / 10_f64.powi(decimals as i32)
}

/// Native/USD answer read from the oracle feed at a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedRound {
    /// Answer normalized to USD
    pub price: f64,
    /// When the round was last updated (unix seconds)
    pub updated_at: u64,
}

impl FeedRound {
    /// Age of the answer relative to `reference_time`.
    pub fn age_secs(&self, reference_time: u64) -> u64 {
        reference_time.saturating_sub(self.updated_at)
    }

    /// Whether the answer is older than `threshold_secs` at `reference_time`.
    pub fn is_stale(&self, threshold_secs: u64, reference_time: u64) -> bool {
        self.age_secs(reference_time) > threshold_secs
    }
}

/// USD price computed from chain state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnChainQuote {
    pub price_usd: f64,
    /// Price in units of the paired asset
    pub price_in_paired: f64,
    pub paired: PairedType,
    /// Native/USD multiplier (only for WETH-paired pools)
    pub native_usd: Option<f64>,
    pub block: u64,
}
