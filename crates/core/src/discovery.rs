//! Dynamic pool discovery through a liquidity index.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use pricehistory_api::{IndexError, PairIndex, PoolCandidate};
use pricehistory_chain::{Network, ReferenceAssets, RetryPolicy};
use tracing::{debug, info, instrument, warn};

use crate::{pool_key, Cache, DiscoveryError, PoolMapping};

/// Default lifetime of a cached discovery result.
pub const DEFAULT_POOL_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Finds the most liquid pool for a token.
///
/// Only the network the index covers is supported. Winners are cached by
/// token for a bounded TTL.
#[derive(Clone)]
pub struct PoolDiscovery {
    index: Arc<dyn PairIndex>,
    cache: Arc<dyn Cache>,
    retry: RetryPolicy,
    network: Network,
    references: ReferenceAssets,
    ttl: Duration,
}

impl std::fmt::Debug for PoolDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolDiscovery")
            .field("network", &self.network)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl PoolDiscovery {
    /// Create discovery over `index`, which covers `network` only.
    pub fn new(
        index: Arc<dyn PairIndex>,
        cache: Arc<dyn Cache>,
        network: Network,
        references: ReferenceAssets,
    ) -> Self {
        Self {
            index,
            cache,
            retry: RetryPolicy::default(),
            network,
            references,
            ttl: DEFAULT_POOL_CACHE_TTL,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Network the index covers.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Most liquid pool containing `token` on `network`.
    #[instrument(skip(self), fields(token = %token, network = %network))]
    pub async fn find_pool(
        &self,
        token: Address,
        network: Network,
    ) -> Result<PoolMapping, DiscoveryError> {
        if network != self.network {
            return Err(DiscoveryError::UnsupportedNetwork(network));
        }

        let key = pool_key(token);
        if let Some(mapping) = self.cached(&key).await {
            debug!(pool = %mapping.pool, "Pool mapping cache hit");
            return Ok(mapping);
        }

        let candidates = self
            .retry
            .run(
                "top_pools_for_token",
                || self.index.top_pools_for_token(token),
                IndexError::is_retryable,
            )
            .await?;

        let mapping = select_pool(token, &candidates, &self.references)
            .ok_or(DiscoveryError::NotFound(token))?;

        info!(
            pool = %mapping.pool,
            paired = %mapping.paired_token,
            paired_type = ?mapping.paired_type,
            candidates = candidates.len(),
            "Discovered pool"
        );

        match serde_json::to_string(&mapping) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&key, value, self.ttl).await {
                    warn!(error = %e, "Failed to cache pool mapping");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode pool mapping"),
        }

        Ok(mapping)
    }

    async fn cached(&self, key: &str) -> Option<PoolMapping> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(mapping) => Some(mapping),
                Err(e) => {
                    warn!(key, error = %e, "Ignoring malformed pool mapping in cache");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Pool cache read failed, querying index");
                None
            }
        }
    }
}

/// First candidate that actually contains `token`, as a mapping.
///
/// `candidates` must already be ranked by liquidity.
pub fn select_pool(
    token: Address,
    candidates: &[PoolCandidate],
    references: &ReferenceAssets,
) -> Option<PoolMapping> {
    candidates.iter().find_map(|candidate| {
        let paired_token = candidate.counter_asset(token)?;
        Some(PoolMapping {
            token,
            pool: candidate.pool,
            paired_token,
            paired_type: references.classify(paired_token),
        })
    })
}
