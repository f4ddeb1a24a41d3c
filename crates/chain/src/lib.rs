//! Price history chain access layer.
//!
//! This crate provides:
//! - The [`ChainReader`] capability and its alloy-backed JSON-RPC implementation
//! - Typed contract bindings for Uniswap V2 pairs, Chainlink feeds and ERC-20 metadata
//! - A bounded [`RetryPolicy`] for transient read failures
//! - Timestamp → block lookup ([`BlockTimestampLocator`])
//! - Contract deployment lookup ([`DeploymentLocator`])
//! - USD price reconstruction from pool reserves ([`OnChainPriceOracle`])
//!
//! Reads target historical blocks, so endpoints must be archive nodes.

pub mod contracts;
mod deployment;
mod error;
mod locator;
mod network;
pub mod oracle;
mod reader;
mod retry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use deployment::DeploymentLocator;
pub use error::ChainError;
pub use locator::BlockTimestampLocator;
pub use network::Network;
pub use oracle::{
    FeedRound, OnChainPriceOracle, OnChainQuote, PairReserves, PairedType, ReferenceAssets,
    DEFAULT_MAX_ORACLE_STALENESS_SECS,
};
pub use reader::{call_typed, BlockHeader, ChainReader, RpcChainReader};
pub use retry::RetryPolicy;
