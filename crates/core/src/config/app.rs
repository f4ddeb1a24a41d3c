//! Runtime configuration with serde defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use pricehistory_chain::{Network, RetryPolicy, DEFAULT_MAX_ORACLE_STALENESS_SECS};
use serde::{Deserialize, Serialize};

use super::NetworkConfig;
use crate::ResolverSettings;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Dynamic pool discovery; disabled when absent
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,

    #[serde(default)]
    pub backfill: BackfillConfig,

    /// Where resolved daily prices are persisted
    #[serde(default)]
    pub store: StoreConfig,

    /// Per-network endpoints, reference assets and static pools, keyed by
    /// network name
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
}

impl AppConfig {
    pub fn network(&self, network: Network) -> Option<&NetworkConfig> {
        self.networks.get(network.as_str())
    }

    /// Configured networks, rejecting unknown names.
    pub fn configured_networks(&self) -> anyhow::Result<Vec<(Network, &NetworkConfig)>> {
        self.networks
            .iter()
            .map(|(name, config)| {
                let network = name
                    .parse::<Network>()
                    .with_context(|| format!("Unknown network '{}' in config", name))?;
                Ok((network, config))
            })
            .collect()
    }

    /// Log a summary of the loaded configuration.
    pub fn log_config(&self) {
        tracing::info!(
            cache_ttl_secs = self.resolver.cache_ttl_secs,
            fallback_price = self.resolver.fallback_sentinel_price,
            max_oracle_staleness_secs = self.resolver.max_oracle_staleness_secs,
            "Resolver configuration loaded"
        );
        tracing::info!(
            max_attempts = self.retry.max_attempts,
            base_delay_ms = self.retry.base_delay_ms,
            max_delay_ms = self.retry.max_delay_ms,
            "Retry policy"
        );
        match &self.store {
            StoreConfig::Sqlite { url } => tracing::info!(url = %url, "Price store: sqlite"),
            StoreConfig::Memory => tracing::info!("Price store: memory (not durable)"),
        }
        match &self.discovery {
            Some(discovery) => tracing::info!(
                network = %discovery.network,
                pairs_per_side = discovery.pairs_per_side,
                pool_cache_ttl_secs = discovery.pool_cache_ttl_secs,
                "Pool discovery enabled"
            ),
            None => tracing::info!("Pool discovery disabled"),
        }
        for (name, config) in &self.networks {
            tracing::info!(
                network = %name,
                static_pools = config.pools.len(),
                references = config.references.is_some(),
                "Network configured"
            );
        }
    }
}

/// Resolver tier parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Price returned by the fallback tier when the block has no base fee
    #[serde(default = "default_fallback_price")]
    pub fallback_sentinel_price: f64,

    /// Oracle answers older than this are logged as stale
    #[serde(default = "default_max_staleness")]
    pub max_oracle_staleness_secs: u64,
}

fn default_cache_ttl() -> u64 {
    3600
}
fn default_fallback_price() -> f64 {
    1.234
}
fn default_max_staleness() -> u64 {
    DEFAULT_MAX_ORACLE_STALENESS_SECS
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            fallback_sentinel_price: default_fallback_price(),
            max_oracle_staleness_secs: default_max_staleness(),
        }
    }
}

impl ResolverConfig {
    pub fn settings(&self) -> ResolverSettings {
        ResolverSettings {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            fallback_sentinel_price: self.fallback_sentinel_price,
        }
    }
}

/// Bounded retry for external reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay() -> u64 {
    200
}
fn default_max_delay() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Liquidity index used for dynamic pool discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// The only network the index covers
    #[serde(default = "default_discovery_network")]
    pub network: Network,

    /// Subgraph endpoint, `${VAR}` references are expanded
    pub subgraph_url: String,

    #[serde(default = "default_pairs_per_side")]
    pub pairs_per_side: u32,

    #[serde(default = "default_cache_ttl")]
    pub pool_cache_ttl_secs: u64,
}

fn default_discovery_network() -> Network {
    Network::Ethereum
}
fn default_pairs_per_side() -> u32 {
    pricehistory_api::DEFAULT_PAIRS_PER_SIDE
}

impl DiscoveryConfig {
    pub fn pool_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.pool_cache_ttl_secs)
    }
}

/// Backfill job worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Walks for different tokens running at once
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Finished job statuses kept for lookup
    #[serde(default = "default_status_retention")]
    pub status_retention: usize,
}

fn default_queue_capacity() -> usize {
    256
}
fn default_max_concurrent_jobs() -> usize {
    4
}
fn default_status_retention() -> usize {
    crate::DEFAULT_STATUS_RETENTION
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            status_retention: default_status_retention(),
        }
    }
}

/// Price store backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process only; history is lost on exit
    Memory,
    Sqlite {
        #[serde(default = "default_database_url")]
        url: String,
    },
}

fn default_database_url() -> String {
    "sqlite://pricehistory.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            url: default_database_url(),
        }
    }
}
