//! Supported EVM networks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ChainError;

/// Network a token lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Polygon,
}

impl Network {
    /// Lowercase identifier used in keys, config tables and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Polygon => "polygon",
        }
    }

    /// EIP-155 chain ID.
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Polygon => 137,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" => Ok(Self::Ethereum),
            "polygon" | "matic" => Ok(Self::Polygon),
            other => Err(ChainError::UnknownNetwork(other.to_string())),
        }
    }
}
