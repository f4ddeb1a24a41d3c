//! Chain-layer error type.

use alloy::primitives::Address;
use alloy::rpc::json_rpc::ErrorPayload;
use alloy::transports::{RpcError, TransportError};
use thiserror::Error;

use crate::Network;

/// Errors raised while reading chain state or deriving prices from it.
///
/// Only [`ChainError::Transport`] is transient; everything else describes the
/// state of the chain (or the request) and will not change on retry.
/// Node error responses are transient only when they signal rate limiting.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC transport failure (timeouts, rate limits, connection resets).
    #[error("RPC read failed: {0}")]
    Transport(String),

    #[error("unknown network '{0}'")]
    UnknownNetwork(String),

    #[error("no RPC endpoint configured for {0}")]
    NetworkNotConfigured(Network),

    #[error("no reference assets configured for {0}")]
    MissingReferences(Network),

    #[error("invalid RPC url '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// The pair contract returned no data: it was not deployed yet.
    #[error("no pool data for {pool} at block {block} (pool may not exist yet)")]
    PoolNotDeployed { pool: Address, block: u64 },

    #[error("token {token} is not a constituent of pool {pool}")]
    TokenNotInPool { token: Address, pool: Address },

    /// Counter-asset is neither the USD-stable nor the wrapped-native reference.
    #[error("paired token {paired} is not WETH or USDC; cannot compute USD price")]
    UnsupportedPair { paired: Address },

    #[error("pool {pool} has empty reserves at block {block}")]
    EmptyReserves { pool: Address, block: u64 },

    #[error("oracle feed {feed} has no data at block {block}")]
    OracleUnavailable { feed: Address, block: u64 },

    #[error("oracle feed {feed} returned non-positive answer {answer}")]
    InvalidOracleAnswer { feed: Address, answer: String },

    #[error("failed to decode {call} result: {reason}")]
    Decode { call: &'static str, reason: String },

    /// The node executed the call and it reverted.
    #[error("call reverted: {reason}")]
    Reverted { reason: String },

    /// The node answered with an error that retrying will not change
    /// (pruned state on a non-archive node, invalid params).
    #[error("RPC request rejected: {0}")]
    Rejected(String),

    /// No block at or before the target timestamp.
    #[error("timestamp {timestamp} precedes the genesis block (at {genesis})")]
    BeforeGenesis { timestamp: u64, genesis: u64 },
}

impl ChainError {
    /// Whether retrying the same read could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        match &err {
            RpcError::ErrorResp(payload) if is_revert(payload) => Self::Reverted {
                reason: payload.message.to_string(),
            },
            RpcError::ErrorResp(payload) if !payload.is_retry_err() => {
                Self::Rejected(payload.to_string())
            }
            _ => Self::Transport(err.to_string()),
        }
    }
}

// Geth reports reverts with code 3; other clients only say so in the message.
fn is_revert(payload: &ErrorPayload) -> bool {
    payload.code == 3 || payload.message.to_ascii_lowercase().contains("revert")
}
