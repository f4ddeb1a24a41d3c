//! Resolution error taxonomy.

use std::fmt;

use pricehistory_api::IndexError;
use pricehistory_chain::{ChainError, Network};
use thiserror::Error;

/// Why a resolution could not produce a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Upstream reads kept failing after retries
    Transient,
    UnsupportedNetwork,
    /// Pool counter-asset is neither the USD-stable nor the wrapped native asset
    UnsupportedPair,
    PoolNotFound,
    /// The pool or oracle had no state at the requested block
    NoDataForDate,
    /// Chain data could not be interpreted
    Malformed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transient => "transient read failure",
            Self::UnsupportedNetwork => "unsupported network",
            Self::UnsupportedPair => "unsupported pair",
            Self::PoolNotFound => "pool not found",
            Self::NoDataForDate => "no data for date",
            Self::Malformed => "malformed chain data",
        };
        f.write_str(s)
    }
}

/// Error returned by [`crate::PriceResolver::resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The request itself is invalid; nothing was read.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{reason}: {source}")]
    Resolution {
        reason: FailureReason,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ResolveError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn resolution(
        reason: FailureReason,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Resolution {
            reason,
            source: source.into(),
        }
    }

    /// Failure category, if this is not a validation error.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Validation(_) => None,
            Self::Resolution { reason, .. } => Some(*reason),
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        self.reason() == Some(FailureReason::Transient)
    }

    /// Message suitable for an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Resolution { reason, .. } => match reason {
                FailureReason::Transient => {
                    "Price source temporarily unavailable, please retry".to_string()
                }
                FailureReason::UnsupportedNetwork => "Network is not supported".to_string(),
                FailureReason::UnsupportedPair => {
                    "Paired token is not WETH or USDC; cannot compute USD price".to_string()
                }
                FailureReason::PoolNotFound => "No Uniswap pool found for this token".to_string(),
                FailureReason::NoDataForDate => {
                    "No price data available for this date (pool may not exist yet)".to_string()
                }
                FailureReason::Malformed => "Unexpected on-chain data for this token".to_string(),
            },
        }
    }
}

impl From<ChainError> for ResolveError {
    fn from(err: ChainError) -> Self {
        let reason = match &err {
            ChainError::Transport(_) => FailureReason::Transient,
            ChainError::UnknownNetwork(_)
            | ChainError::NetworkNotConfigured(_)
            | ChainError::MissingReferences(_) => FailureReason::UnsupportedNetwork,
            ChainError::PoolNotDeployed { .. }
            | ChainError::EmptyReserves { .. }
            | ChainError::OracleUnavailable { .. }
            | ChainError::BeforeGenesis { .. } => FailureReason::NoDataForDate,
            ChainError::UnsupportedPair { .. } | ChainError::TokenNotInPool { .. } => {
                FailureReason::UnsupportedPair
            }
            ChainError::InvalidOracleAnswer { .. }
            | ChainError::Decode { .. }
            | ChainError::Reverted { .. }
            | ChainError::Rejected(_)
            | ChainError::InvalidEndpoint { .. } => FailureReason::Malformed,
        };
        Self::resolution(reason, err)
    }
}

/// Pool discovery failures.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("pool discovery is not available on {0}")]
    UnsupportedNetwork(Network),

    #[error("no pool found for token {0}")]
    NotFound(alloy::primitives::Address),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl DiscoveryError {
    /// Whether the outcome means "this token has no known pool".
    pub fn is_no_pool(&self) -> bool {
        matches!(self, Self::UnsupportedNetwork(_) | Self::NotFound(_))
    }
}

impl From<DiscoveryError> for ResolveError {
    fn from(err: DiscoveryError) -> Self {
        let reason = match &err {
            DiscoveryError::UnsupportedNetwork(_) => FailureReason::UnsupportedNetwork,
            DiscoveryError::NotFound(_) => FailureReason::PoolNotFound,
            DiscoveryError::Index(e) if e.is_retryable() => FailureReason::Transient,
            DiscoveryError::Index(_) => FailureReason::Malformed,
        };
        Self::resolution(reason, err)
    }
}

/// Cache backend failure.
#[derive(Debug, Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// Price store backend failure.
#[derive(Debug, Error)]
#[error("price store error: {0}")]
pub struct StoreError(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn test_chain_error_classification() {
        let transient: ResolveError = ChainError::Transport("timeout".into()).into();
        assert_eq!(transient.reason(), Some(FailureReason::Transient));
        assert!(transient.is_retryable());

        let not_deployed: ResolveError = ChainError::PoolNotDeployed {
            pool: Address::ZERO,
            block: 5,
        }
        .into();
        assert_eq!(not_deployed.reason(), Some(FailureReason::NoDataForDate));
        assert!(!not_deployed.is_retryable());
        assert!(not_deployed.to_string().contains("pool may not exist yet"));

        let pair: ResolveError = ChainError::UnsupportedPair {
            paired: Address::ZERO,
        }
        .into();
        assert_eq!(
            pair.user_message(),
            "Paired token is not WETH or USDC; cannot compute USD price"
        );
    }

    #[test]
    fn test_structural_chain_errors_are_final() {
        let reverted: ResolveError = ChainError::Reverted {
            reason: "execution reverted".into(),
        }
        .into();
        assert_eq!(reverted.reason(), Some(FailureReason::Malformed));
        assert!(!reverted.is_retryable());

        let early: ResolveError = ChainError::BeforeGenesis {
            timestamp: 10,
            genesis: 1_000,
        }
        .into();
        assert_eq!(early.reason(), Some(FailureReason::NoDataForDate));
        assert!(!early.is_retryable());
    }

    #[test]
    fn test_discovery_error_classification() {
        let not_found = DiscoveryError::NotFound(Address::ZERO);
        assert!(not_found.is_no_pool());
        assert!(DiscoveryError::UnsupportedNetwork(Network::Polygon).is_no_pool());

        let index: ResolveError = DiscoveryError::Index(IndexError::Http("503".into())).into();
        assert!(index.is_retryable());
    }

    #[test]
    fn test_validation_message() {
        let err = ResolveError::validation("Timestamp is in the future. Please use a past date.");
        assert_eq!(err.reason(), None);
        assert_eq!(
            err.user_message(),
            "Timestamp is in the future. Please use a past date."
        );
    }
}
