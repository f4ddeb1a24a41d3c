//! Per-network configuration.

use alloy::primitives::Address;
use pricehistory_chain::ReferenceAssets;
use serde::{Deserialize, Serialize};

use crate::PoolMapping;

/// One network's RPC endpoint, reference assets and static pool table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// HTTP RPC endpoint, `${VAR}` references are expanded
    pub rpc_url: String,

    /// Required for on-chain pricing on this network
    #[serde(default)]
    pub references: Option<ReferenceConfig>,

    /// Operator-curated token → pool table
    #[serde(default)]
    pub pools: Vec<StaticPool>,
}

impl NetworkConfig {
    pub fn reference_assets(&self) -> Option<ReferenceAssets> {
        self.references.as_ref().map(ReferenceConfig::to_assets)
    }

    /// Static pools as mappings, classified against the reference assets.
    pub fn static_mappings(&self) -> Vec<PoolMapping> {
        let Some(references) = self.reference_assets() else {
            return Vec::new();
        };
        self.pools
            .iter()
            .map(|entry| PoolMapping {
                token: entry.token,
                pool: entry.pool,
                paired_token: entry.paired_token,
                paired_type: references.classify(entry.paired_token),
            })
            .collect()
    }
}

/// Reference assets for pricing on one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// USD stablecoin address
    pub usd_stable: Address,
    #[serde(default = "default_stable_decimals")]
    pub usd_stable_decimals: u8,

    /// Wrapped native asset address (WETH, WMATIC)
    pub wrapped_native: Address,
    #[serde(default = "default_native_decimals")]
    pub wrapped_native_decimals: u8,

    /// Native/USD aggregator
    pub native_usd_feed: Address,
    #[serde(default = "default_feed_decimals")]
    pub feed_decimals: u8,
}

fn default_stable_decimals() -> u8 {
    6
}
fn default_native_decimals() -> u8 {
    18
}
fn default_feed_decimals() -> u8 {
    8
}

impl ReferenceConfig {
    pub fn to_assets(&self) -> ReferenceAssets {
        ReferenceAssets {
            usd_stable: self.usd_stable,
            usd_stable_decimals: self.usd_stable_decimals,
            wrapped_native: self.wrapped_native,
            wrapped_native_decimals: self.wrapped_native_decimals,
            native_usd_feed: self.native_usd_feed,
            feed_decimals: self.feed_decimals,
        }
    }
}

/// Static pool table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPool {
    pub token: Address,
    pub pool: Address,
    pub paired_token: Address,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use pricehistory_chain::PairedType;

    const NETWORK: &str = r#"
        rpc_url = "http://localhost:8545"

        [references]
        usd_stable = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
        wrapped_native = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
        native_usd_feed = "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419"

        [[pools]]
        token = "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"
        pool = "0xd3d2E2692501A5c9Ca623199D38826e513033a17"
        paired_token = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

        [[pools]]
        token = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
        pool = "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc"
        paired_token = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
    "#;

    #[test]
    fn test_reference_decimals_default() {
        let config: NetworkConfig = toml::from_str(NETWORK).unwrap();
        let assets = config.reference_assets().unwrap();
        assert_eq!(assets.usd_stable_decimals, 6);
        assert_eq!(assets.wrapped_native_decimals, 18);
        assert_eq!(assets.feed_decimals, 8);
    }

    #[test]
    fn test_static_mappings_are_classified() {
        let config: NetworkConfig = toml::from_str(NETWORK).unwrap();
        let mappings = config.static_mappings();
        assert_eq!(mappings.len(), 2);
        assert_eq!(
            mappings[0].token,
            address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984")
        );
        assert_eq!(mappings[0].paired_type, PairedType::Weth);
        assert_eq!(mappings[1].paired_type, PairedType::Usdc);
    }

    #[test]
    fn test_no_references_no_static_pools() {
        let config: NetworkConfig = toml::from_str(
            r#"
            rpc_url = "http://localhost:8545"
            [[pools]]
            token = "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"
            pool = "0xd3d2E2692501A5c9Ca623199D38826e513033a17"
            paired_token = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
            "#,
        )
        .unwrap();
        assert!(config.reference_assets().is_none());
        assert!(config.static_mappings().is_empty());
    }
}
