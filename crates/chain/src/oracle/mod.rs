//! USD price reconstruction at historical blocks.
//!
//! A token's price is derived from the reserves of a two-asset pool at a
//! block:
//!
//! - paired with the network's USD-stable asset, the reserve ratio is the
//!   price;
//! - paired with the wrapped native asset, the ratio is multiplied by the
//!   native/USD Chainlink answer read at the same block;
//! - anything else is rejected (no multi-hop routing).
//!
//! # Example
//!
//! ```rust,ignore
//! let oracle = OnChainPriceOracle::new(reader, RetryPolicy::default())
//!     .with_references(Network::Ethereum, mainnet_references);
//!
//! let quote = oracle
//!     .price_at_block(Network::Ethereum, token, pool, 18_000_000)
//!     .await?;
//! println!("{} USD", quote.price_usd);
//! ```

mod chainlink;
mod types;

pub use chainlink::{normalize_answer, ChainlinkFeed};
pub use types::{scale, FeedRound, OnChainQuote, PairReserves, PairedType, ReferenceAssets};

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, instrument, warn};

use crate::contracts::{IERC20Metadata, IUniswapV2Pair};
use crate::{call_typed, ChainError, ChainReader, Network, RetryPolicy};

/// Default maximum feed age before a staleness warning (one day).
pub const DEFAULT_MAX_ORACLE_STALENESS_SECS: u64 = 86_400;

/// Decimals assumed for tokens whose `decimals()` returns nothing.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Prices tokens from pool reserves and the native/USD feed.
#[derive(Clone)]
pub struct OnChainPriceOracle {
    reader: Arc<dyn ChainReader>,
    retry: RetryPolicy,
    references: HashMap<Network, ReferenceAssets>,
    max_staleness_secs: u64,
}

impl std::fmt::Debug for OnChainPriceOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnChainPriceOracle")
            .field("networks", &self.references.keys().collect::<Vec<_>>())
            .field("max_staleness_secs", &self.max_staleness_secs)
            .finish()
    }
}

impl OnChainPriceOracle {
    pub fn new(reader: Arc<dyn ChainReader>, retry: RetryPolicy) -> Self {
        Self {
            reader,
            retry,
            references: HashMap::new(),
            max_staleness_secs: DEFAULT_MAX_ORACLE_STALENESS_SECS,
        }
    }

    /// Register the reference assets of a network.
    pub fn with_references(mut self, network: Network, references: ReferenceAssets) -> Self {
        self.references.insert(network, references);
        self
    }

    /// Set the feed age above which a staleness warning is logged.
    pub fn with_max_staleness(mut self, secs: u64) -> Self {
        self.max_staleness_secs = secs;
        self
    }

    /// Reference assets of `network`.
    pub fn references(&self, network: Network) -> Result<&ReferenceAssets, ChainError> {
        self.references
            .get(&network)
            .ok_or(ChainError::MissingReferences(network))
    }

    /// Reserves and constituents of `pool` at `block`.
    pub async fn read_reserves(
        &self,
        network: Network,
        pool: Address,
        block: u64,
    ) -> Result<PairReserves, ChainError> {
        let not_deployed = || ChainError::PoolNotDeployed { pool, block };

        let reserves = self
            .retry
            .run_chain("getReserves", || {
                call_typed(
                    self.reader.as_ref(),
                    network,
                    pool,
                    &IUniswapV2Pair::getReservesCall {},
                    block,
                )
            })
            .await?
            .ok_or_else(not_deployed)?;

        let token0 = self
            .retry
            .run_chain("token0", || {
                call_typed(
                    self.reader.as_ref(),
                    network,
                    pool,
                    &IUniswapV2Pair::token0Call {},
                    block,
                )
            })
            .await?
            .ok_or_else(not_deployed)?;

        let token1 = self
            .retry
            .run_chain("token1", || {
                call_typed(
                    self.reader.as_ref(),
                    network,
                    pool,
                    &IUniswapV2Pair::token1Call {},
                    block,
                )
            })
            .await?
            .ok_or_else(not_deployed)?;

        Ok(PairReserves {
            pool,
            token0,
            token1,
            reserve0: reserves.reserve0.to::<u128>(),
            reserve1: reserves.reserve1.to::<u128>(),
        })
    }

    /// `decimals()` of `token` at `block`, defaulting to 18 when it returns
    /// nothing, garbage or reverts.
    pub async fn token_decimals(
        &self,
        network: Network,
        token: Address,
        block: u64,
    ) -> Result<u8, ChainError> {
        let result = self
            .retry
            .run_chain("decimals", || {
                call_typed(
                    self.reader.as_ref(),
                    network,
                    token,
                    &IERC20Metadata::decimalsCall {},
                    block,
                )
            })
            .await;

        match result {
            Ok(Some(decimals)) => Ok(decimals),
            Ok(None) => Ok(DEFAULT_TOKEN_DECIMALS),
            Err(ChainError::Decode { reason, .. } | ChainError::Reverted { reason }) => {
                debug!(token = %token, reason = %reason, "Unreadable decimals, assuming 18");
                Ok(DEFAULT_TOKEN_DECIMALS)
            }
            Err(e) => Err(e),
        }
    }

    /// Native/USD answer at `block`, warning when it is stale.
    pub async fn native_usd(&self, network: Network, block: u64) -> Result<f64, ChainError> {
        let references = self.references(network)?;
        let feed = ChainlinkFeed::new(
            references.native_usd_feed,
            references.feed_decimals,
            self.reader.clone(),
            self.retry.clone(),
        );
        let round = feed.round_at(network, block).await?;

        let header = self
            .retry
            .run_chain("block_header", || self.reader.block_header(network, block))
            .await?;
        if let Some(header) = header {
            if round.is_stale(self.max_staleness_secs, header.timestamp) {
                warn!(
                    network = %network,
                    feed = %feed.address(),
                    block,
                    age_secs = round.age_secs(header.timestamp),
                    "Stale native/USD answer, using it anyway"
                );
            }
        }

        Ok(round.price)
    }

    /// USD price of `token` from `pool` as of `block`.
    #[instrument(skip(self), fields(network = %network, token = %token, pool = %pool))]
    pub async fn price_at_block(
        &self,
        network: Network,
        token: Address,
        pool: Address,
        block: u64,
    ) -> Result<OnChainQuote, ChainError> {
        let references = self.references(network)?;
        let reserves = self.read_reserves(network, pool, block).await?;

        let counter = reserves.counter_asset(token)?;
        let paired = references.classify(counter);
        let Some(paired_decimals) = references.decimals_of(paired) else {
            return Err(ChainError::UnsupportedPair { paired: counter });
        };

        let token_decimals = self.token_decimals(network, token, block).await?;
        let price_in_paired =
            reserves.price_in_paired(token, token_decimals, paired_decimals, block)?;

        let native_usd = match paired {
            PairedType::Weth => Some(self.native_usd(network, block).await?),
            _ => None,
        };
        let price_usd = price_in_paired * native_usd.unwrap_or(1.0);

        debug!(
            paired = ?paired,
            price_in_paired,
            native_usd = ?native_usd,
            price_usd,
            "Priced from reserves"
        );

        Ok(OnChainQuote {
            price_usd,
            price_in_paired,
            paired,
            native_usd,
            block,
        })
    }
}
