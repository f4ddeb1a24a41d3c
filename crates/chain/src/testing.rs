//! In-memory chain used by unit tests across the workspace.
//!
//! Blocks are indexed from genesis (block 0). Pair, feed and token contracts
//! answer only once the chain has reached their deployment block, and return
//! empty data before that, the same way a node does for an address without
//! code.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use alloy::primitives::aliases::{U112, U80};
use alloy::primitives::{Address, Bytes, I256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use crate::contracts::{IAggregatorV3, IERC20Metadata, IUniswapV2Pair};
use crate::{BlockHeader, ChainError, ChainReader, Network};

#[derive(Debug, Clone)]
struct MockPair {
    token0: Address,
    token1: Address,
    reserve0: u128,
    reserve1: u128,
    deployed_at: u64,
}

#[derive(Debug, Clone)]
struct MockFeed {
    answer: i128,
    updated_at: u64,
    deployed_at: u64,
}

#[derive(Debug, Clone)]
struct MockToken {
    decimals: Option<u8>,
    deployed_at: u64,
}

/// Scripted [`ChainReader`] with deterministic block timestamps.
#[derive(Debug, Default)]
pub struct MockChain {
    timestamps: Vec<u64>,
    base_fee_per_gas: Option<u64>,
    pairs: HashMap<Address, MockPair>,
    feeds: HashMap<Address, MockFeed>,
    tokens: HashMap<Address, MockToken>,
    reverting: HashSet<Address>,
    transient_failures: AtomicU32,
    reads: AtomicUsize,
    header_reads: AtomicUsize,
    calls: AtomicUsize,
}

impl MockChain {
    /// Chain with explicit per-block timestamps (index = block number).
    pub fn with_timestamps(timestamps: Vec<u64>) -> Self {
        Self {
            timestamps,
            ..Self::default()
        }
    }

    /// Chain of `count` blocks, `spacing` seconds apart, starting at `genesis`.
    pub fn with_blocks(genesis: u64, spacing: u64, count: u64) -> Self {
        Self::with_timestamps((0..count).map(|n| genesis + n * spacing).collect())
    }

    pub fn base_fee(mut self, wei: u64) -> Self {
        self.base_fee_per_gas = Some(wei);
        self
    }

    pub fn pair(
        mut self,
        pool: Address,
        token0: Address,
        token1: Address,
        reserves: (u128, u128),
        deployed_at: u64,
    ) -> Self {
        self.pairs.insert(
            pool,
            MockPair {
                token0,
                token1,
                reserve0: reserves.0,
                reserve1: reserves.1,
                deployed_at,
            },
        );
        self
    }

    pub fn feed(mut self, feed: Address, answer: i128, updated_at: u64) -> Self {
        self.feeds.insert(
            feed,
            MockFeed {
                answer,
                updated_at,
                deployed_at: 0,
            },
        );
        self
    }

    pub fn token(mut self, token: Address, decimals: Option<u8>, deployed_at: u64) -> Self {
        self.tokens.insert(
            token,
            MockToken {
                decimals,
                deployed_at,
            },
        );
        self
    }

    /// Make every call to `address` revert.
    pub fn reverting(mut self, address: Address) -> Self {
        self.reverting.insert(address);
        self
    }

    /// Fail the next `n` reads with a transport error.
    pub fn fail_next(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn timestamp_of(&self, block: u64) -> Option<u64> {
        self.timestamps.get(block as usize).copied()
    }

    /// Number of `block_header` reads served.
    pub fn header_reads(&self) -> usize {
        self.header_reads.load(Ordering::SeqCst)
    }

    /// Number of `eth_call` reads served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total reads of any kind, failed ones included.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn maybe_fail(&self) -> Result<(), ChainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ChainError::Transport("connection reset".into()));
        }
        Ok(())
    }

    fn answer(&self, to: Address, selector: [u8; 4], block: u64) -> Vec<u8> {
        if let Some(pair) = self.pairs.get(&to).filter(|p| block >= p.deployed_at) {
            if selector == IUniswapV2Pair::getReservesCall::SELECTOR {
                return IUniswapV2Pair::getReservesCall::abi_encode_returns(
                    &IUniswapV2Pair::getReservesReturn {
                        reserve0: U112::from(pair.reserve0),
                        reserve1: U112::from(pair.reserve1),
                        blockTimestampLast: 0,
                    },
                );
            }
            if selector == IUniswapV2Pair::token0Call::SELECTOR {
                return IUniswapV2Pair::token0Call::abi_encode_returns(&pair.token0);
            }
            if selector == IUniswapV2Pair::token1Call::SELECTOR {
                return IUniswapV2Pair::token1Call::abi_encode_returns(&pair.token1);
            }
            return Vec::new();
        }

        if let Some(feed) = self.feeds.get(&to).filter(|f| block >= f.deployed_at) {
            if selector == IAggregatorV3::latestRoundDataCall::SELECTOR {
                let answer = if feed.answer < 0 {
                    -I256::from_raw(U256::from(feed.answer.unsigned_abs()))
                } else {
                    I256::from_raw(U256::from(feed.answer as u128))
                };
                return IAggregatorV3::latestRoundDataCall::abi_encode_returns(
                    &IAggregatorV3::latestRoundDataReturn {
                        roundId: U80::from(1u64),
                        answer,
                        startedAt: U256::from(feed.updated_at),
                        updatedAt: U256::from(feed.updated_at),
                        answeredInRound: U80::from(1u64),
                    },
                );
            }
        }

        if let Some(token) = self.tokens.get(&to).filter(|t| block >= t.deployed_at) {
            if selector == IERC20Metadata::decimalsCall::SELECTOR {
                if let Some(decimals) = token.decimals {
                    return IERC20Metadata::decimalsCall::abi_encode_returns(&decimals);
                }
            }
        }

        Vec::new()
    }

    fn deployed_at(&self, address: Address) -> Option<u64> {
        self.pairs
            .get(&address)
            .map(|p| p.deployed_at)
            .or_else(|| self.feeds.get(&address).map(|f| f.deployed_at))
            .or_else(|| self.tokens.get(&address).map(|t| t.deployed_at))
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn latest_block_number(&self, _network: Network) -> Result<u64, ChainError> {
        self.maybe_fail()?;
        Ok(self.timestamps.len().saturating_sub(1) as u64)
    }

    async fn block_header(
        &self,
        _network: Network,
        number: u64,
    ) -> Result<Option<BlockHeader>, ChainError> {
        self.maybe_fail()?;
        self.header_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.timestamp_of(number).map(|timestamp| BlockHeader {
            number,
            timestamp,
            base_fee_per_gas: self.base_fee_per_gas,
        }))
    }

    async fn call(
        &self,
        _network: Network,
        to: Address,
        calldata: Bytes,
        block: u64,
    ) -> Result<Bytes, ChainError> {
        self.maybe_fail()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reverting.contains(&to) {
            return Err(ChainError::Reverted {
                reason: "execution reverted".into(),
            });
        }
        let Some(selector) = calldata.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok()) else {
            return Ok(Bytes::new());
        };
        Ok(Bytes::from(self.answer(to, selector, block)))
    }

    async fn code_at(
        &self,
        _network: Network,
        address: Address,
        block: u64,
    ) -> Result<Bytes, ChainError> {
        self.maybe_fail()?;
        match self.deployed_at(address) {
            Some(deployed) if block >= deployed => Ok(Bytes::from_static(&[0x60, 0x80])),
            _ => Ok(Bytes::new()),
        }
    }
}
