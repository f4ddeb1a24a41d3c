//! Tiered historical price resolution.
//!
//! Tiers are tried in order and the first one that produces a price wins:
//!
//! 1. **Cache** by `(token, network, timestamp)`
//! 2. **Persisted** point for the UTC date
//! 3. **Interpolated** between the nearest persisted points around the date
//! 4. **On-chain** reconstruction from a known pool's reserves
//! 5. **Fallback** estimate for tokens without a known pool
//!
//! Cache and store failures in tiers 1-3 are logged and treated as misses.
//! Failures in tiers 4-5 are returned to the caller. Every new price is
//! written to the store and the cache before it is returned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use pricehistory_chain::{BlockTimestampLocator, Network, OnChainPriceOracle};
use tracing::{debug, info, instrument, warn};

use crate::types::ensure_not_future;
use crate::{
    date_of, interpolate, price_key, unix_now, Cache, PoolDiscovery, PoolMapping, PricePoint,
    PriceSource, PriceStore, ResolveError,
};

/// Result of one tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Resolved(PricePoint),
    /// The tier has nothing for this request; try the next one
    NotApplicable,
}

/// Anything that can resolve a historical price.
#[async_trait]
pub trait ResolvePrice: Send + Sync {
    async fn resolve(
        &self,
        token: Address,
        network: Network,
        timestamp: u64,
    ) -> Result<PricePoint, ResolveError>;
}

/// Resolver tunables.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Lifetime of cached prices
    pub cache_ttl: Duration,
    /// Fallback price used when the block has no base fee
    pub fallback_sentinel_price: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            fallback_sentinel_price: 1.234,
        }
    }
}

/// Five-tier price resolver.
///
/// Holds no per-key locks: concurrent misses for the same key may both run
/// tier 4 and both write; the store keeps the first write.
#[derive(Clone)]
pub struct PriceResolver {
    cache: Arc<dyn Cache>,
    store: Arc<dyn PriceStore>,
    locator: BlockTimestampLocator,
    oracle: OnChainPriceOracle,
    discovery: Option<PoolDiscovery>,
    static_pools: HashMap<(Network, Address), PoolMapping>,
    settings: ResolverSettings,
}

impl std::fmt::Debug for PriceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceResolver")
            .field("static_pools", &self.static_pools.len())
            .field("discovery", &self.discovery.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

impl PriceResolver {
    pub fn new(
        cache: Arc<dyn Cache>,
        store: Arc<dyn PriceStore>,
        locator: BlockTimestampLocator,
        oracle: OnChainPriceOracle,
    ) -> Self {
        Self {
            cache,
            store,
            locator,
            oracle,
            discovery: None,
            static_pools: HashMap::new(),
            settings: ResolverSettings::default(),
        }
    }

    /// Enable dynamic pool discovery for tokens missing from the static table.
    pub fn with_discovery(mut self, discovery: PoolDiscovery) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Add operator-configured pool mappings for `network`.
    pub fn with_static_pools(
        mut self,
        network: Network,
        pools: impl IntoIterator<Item = PoolMapping>,
    ) -> Self {
        for mapping in pools {
            self.static_pools.insert((network, mapping.token), mapping);
        }
        self
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Operator-configured pool for `token`, if any.
    pub fn static_mapping(&self, token: Address, network: Network) -> Option<&PoolMapping> {
        self.static_pools.get(&(network, token))
    }

    /// Resolve the USD price of `token` on `network` at `timestamp`.
    #[instrument(skip(self), fields(token = %token, network = %network))]
    pub async fn resolve(
        &self,
        token: Address,
        network: Network,
        timestamp: u64,
    ) -> Result<PricePoint, ResolveError> {
        ensure_not_future(timestamp, unix_now())?;

        if let TierOutcome::Resolved(point) = self.from_cache(token, network, timestamp).await {
            info!(price = point.price, source = %point.source, "Resolved price");
            return Ok(point);
        }

        if let TierOutcome::Resolved(point) = self.from_persisted(token, network, timestamp).await {
            return Ok(self.finish(point, false).await);
        }

        if let TierOutcome::Resolved(point) = self.interpolated(token, network, timestamp).await {
            return Ok(self.finish(point, false).await);
        }

        if let TierOutcome::Resolved(point) = self.onchain(token, network, timestamp).await? {
            return Ok(self.finish(point, true).await);
        }

        let point = self.fallback(token, network, timestamp).await?;
        Ok(self.finish(point, true).await)
    }

    /// Tier 1: cached price for the exact request.
    async fn from_cache(&self, token: Address, network: Network, timestamp: u64) -> TierOutcome {
        let key = price_key(token, network, timestamp);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<PricePoint>(&raw) {
                Ok(point) => {
                    TierOutcome::Resolved(point.served_as(timestamp, PriceSource::Cache))
                }
                Err(e) => {
                    warn!(key, error = %e, "Ignoring malformed cached price");
                    TierOutcome::NotApplicable
                }
            },
            Ok(None) => {
                debug!("Cache miss");
                TierOutcome::NotApplicable
            }
            Err(e) => {
                warn!(error = %e, "Cache read failed, treating as miss");
                TierOutcome::NotApplicable
            }
        }
    }

    /// Tier 2: persisted point for the same UTC date.
    async fn from_persisted(
        &self,
        token: Address,
        network: Network,
        timestamp: u64,
    ) -> TierOutcome {
        match self.store.find_exact(token, network, date_of(timestamp)).await {
            Ok(Some(point)) => {
                TierOutcome::Resolved(point.served_as(timestamp, PriceSource::Persisted))
            }
            Ok(None) => {
                debug!("No persisted point for date");
                TierOutcome::NotApplicable
            }
            Err(e) => {
                warn!(error = %e, "Store lookup failed, treating as miss");
                TierOutcome::NotApplicable
            }
        }
    }

    /// Tier 3: linear interpolation between the neighbouring persisted points.
    async fn interpolated(&self, token: Address, network: Network, timestamp: u64) -> TierOutcome {
        let date = date_of(timestamp);
        let before = self.store.find_nearest_before(token, network, date).await;
        let after = self.store.find_nearest_after(token, network, date).await;

        let (before, after) = match (before, after) {
            (Ok(Some(before)), Ok(Some(after))) => (before, after),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Store neighbour lookup failed, skipping interpolation");
                return TierOutcome::NotApplicable;
            }
            _ => {
                debug!("Missing neighbour for interpolation");
                return TierOutcome::NotApplicable;
            }
        };
        if before.timestamp == after.timestamp {
            return TierOutcome::NotApplicable;
        }

        let price = interpolate(
            timestamp,
            before.timestamp,
            before.price,
            after.timestamp,
            after.price,
        );
        debug!(
            before = before.timestamp,
            after = after.timestamp,
            price,
            "Interpolated between persisted points"
        );
        TierOutcome::Resolved(PricePoint::new(
            token,
            network,
            timestamp,
            price,
            PriceSource::Interpolated,
        ))
    }

    /// Pool to price `token` from: static table first, then discovery.
    async fn pool_for(
        &self,
        token: Address,
        network: Network,
    ) -> Result<Option<PoolMapping>, ResolveError> {
        if let Some(mapping) = self.static_mapping(token, network) {
            return Ok(Some(*mapping));
        }
        let Some(discovery) = &self.discovery else {
            return Ok(None);
        };
        match discovery.find_pool(token, network).await {
            Ok(mapping) => Ok(Some(mapping)),
            Err(e) if e.is_no_pool() => {
                debug!(reason = %e, "No known pool");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tier 4: price from pool reserves at the located block.
    async fn onchain(
        &self,
        token: Address,
        network: Network,
        timestamp: u64,
    ) -> Result<TierOutcome, ResolveError> {
        let Some(mapping) = self.pool_for(token, network).await? else {
            return Ok(TierOutcome::NotApplicable);
        };

        let block = self.locator.locate_block(network, timestamp).await?;
        let quote = self
            .oracle
            .price_at_block(network, token, mapping.pool, block)
            .await?;

        debug!(
            pool = %mapping.pool,
            block,
            paired = ?quote.paired,
            "Reconstructed price from reserves"
        );
        Ok(TierOutcome::Resolved(PricePoint::new(
            token,
            network,
            timestamp,
            quote.price_usd,
            PriceSource::Onchain,
        )))
    }

    /// Tier 5: base-fee estimate at the located block.
    async fn fallback(
        &self,
        token: Address,
        network: Network,
        timestamp: u64,
    ) -> Result<PricePoint, ResolveError> {
        let block = self.locator.locate_block(network, timestamp).await?;
        let header = self.locator.header(network, block).await?;

        let price = match header.and_then(|h| h.base_fee_per_gas) {
            Some(base_fee) => base_fee as f64 / 1e9,
            None => self.settings.fallback_sentinel_price,
        };

        debug!(block, price, "Using fallback estimate");
        Ok(PricePoint::new(
            token,
            network,
            timestamp,
            price,
            PriceSource::Fallback,
        ))
    }

    /// Write-through and log a resolved point.
    async fn finish(&self, point: PricePoint, persist: bool) -> PricePoint {
        if persist {
            match self.store.insert(&point).await {
                Ok(true) => {}
                Ok(false) => debug!("Point for date already persisted by another writer"),
                Err(e) => warn!(error = %e, "Failed to persist price"),
            }
        }

        let key = price_key(point.token, point.network, point.timestamp);
        match serde_json::to_string(&point) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&key, value, self.settings.cache_ttl).await {
                    warn!(error = %e, "Failed to cache price");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode price for cache"),
        }

        info!(price = point.price, source = %point.source, "Resolved price");
        point
    }
}

#[async_trait]
impl ResolvePrice for PriceResolver {
    async fn resolve(
        &self,
        token: Address,
        network: Network,
        timestamp: u64,
    ) -> Result<PricePoint, ResolveError> {
        PriceResolver::resolve(self, token, network, timestamp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        start_of_day, CacheError, DiscoveryError, FailureReason, MemoryCache, MemoryPriceStore,
    };
    use chrono::NaiveDate;
    use pricehistory_api::{IndexError, PairIndex, PoolCandidate};
    use pricehistory_chain::testing::MockChain;
    use pricehistory_chain::{ChainReader, PairedType, ReferenceAssets, RetryPolicy};

    const GENESIS: u64 = 1_600_000_000;
    const SPACING: u64 = 12;

    fn token() -> Address {
        Address::repeat_byte(0xaa)
    }
    fn usdc() -> Address {
        Address::repeat_byte(0xbb)
    }
    fn weth() -> Address {
        Address::repeat_byte(0xcc)
    }
    fn pool() -> Address {
        Address::repeat_byte(0x01)
    }

    fn at_block(block: u64) -> u64 {
        GENESIS + SPACING * block + 3
    }

    fn references() -> ReferenceAssets {
        ReferenceAssets {
            usd_stable: usdc(),
            usd_stable_decimals: 18,
            wrapped_native: weth(),
            wrapped_native_decimals: 18,
            native_usd_feed: Address::repeat_byte(0xdd),
            feed_decimals: 8,
        }
    }

    fn static_pool() -> PoolMapping {
        PoolMapping {
            token: token(),
            pool: pool(),
            paired_token: usdc(),
            paired_type: PairedType::Usdc,
        }
    }

    fn usdc_chain() -> MockChain {
        MockChain::with_blocks(GENESIS, SPACING, 1_000).pair(
            pool(),
            token(),
            usdc(),
            (1_000, 3_500_000),
            0,
        )
    }

    struct Harness {
        chain: Arc<MockChain>,
        cache: Arc<MemoryCache>,
        store: Arc<MemoryPriceStore>,
        resolver: PriceResolver,
    }

    fn harness_with(chain: MockChain, cache: Arc<dyn Cache>, pools: Vec<PoolMapping>) -> Harness {
        let chain = Arc::new(chain);
        let reader: Arc<dyn ChainReader> = chain.clone();
        let retry = RetryPolicy::new(2, Duration::ZERO, Duration::ZERO);
        let store = Arc::new(MemoryPriceStore::new());
        let resolver = PriceResolver::new(
            cache,
            store.clone(),
            BlockTimestampLocator::new(reader.clone(), retry.clone()),
            OnChainPriceOracle::new(reader, retry).with_references(Network::Ethereum, references()),
        )
        .with_static_pools(Network::Ethereum, pools);
        Harness {
            chain,
            cache: Arc::new(MemoryCache::new()),
            store,
            resolver,
        }
    }

    fn harness(chain: MockChain, pools: Vec<PoolMapping>) -> Harness {
        let cache = Arc::new(MemoryCache::new());
        let mut h = harness_with(chain, cache.clone(), pools);
        h.cache = cache;
        h
    }

    struct EmptyIndex;

    #[async_trait]
    impl PairIndex for EmptyIndex {
        async fn top_pools_for_token(
            &self,
            _token: Address,
        ) -> Result<Vec<PoolCandidate>, IndexError> {
            Ok(Vec::new())
        }
    }

    struct DownIndex;

    #[async_trait]
    impl PairIndex for DownIndex {
        async fn top_pools_for_token(
            &self,
            _token: Address,
        ) -> Result<Vec<PoolCandidate>, IndexError> {
            Err(IndexError::Http("502 Bad Gateway".into()))
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError("timeout".into()))
        }
        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError("timeout".into()))
        }
    }

    #[tokio::test]
    async fn test_onchain_then_cache_hit() {
        let h = harness(usdc_chain(), vec![static_pool()]);
        let ts = at_block(500);

        let first = h.resolver.resolve(token(), Network::Ethereum, ts).await.unwrap();
        assert_eq!(first.source, PriceSource::Onchain);
        assert!((first.price - 3500.0).abs() < 1e-9);

        let reads = h.chain.reads();
        let second = h.resolver.resolve(token(), Network::Ethereum, ts).await.unwrap();
        assert_eq!(second.source, PriceSource::Cache);
        assert_eq!(second.price, first.price);
        assert_eq!(h.chain.reads(), reads);
    }

    #[tokio::test]
    async fn test_onchain_writes_through() {
        let h = harness(usdc_chain(), vec![static_pool()]);
        let ts = at_block(500);
        h.resolver.resolve(token(), Network::Ethereum, ts).await.unwrap();

        let stored = h
            .store
            .find_exact(token(), Network::Ethereum, date_of(ts))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.source, PriceSource::Onchain);
        assert_eq!(stored.timestamp, start_of_day(date_of(ts)));
        assert!(h
            .cache
            .get(&price_key(token(), Network::Ethereum, ts))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_persisted_match_skips_chain() {
        let h = harness(usdc_chain(), vec![static_pool()]);
        let ts = at_block(500);
        h.store
            .insert(&PricePoint::new(
                token(),
                Network::Ethereum,
                ts,
                42.0,
                PriceSource::Onchain,
            ))
            .await
            .unwrap();

        let point = h.resolver.resolve(token(), Network::Ethereum, ts).await.unwrap();
        assert_eq!(point.source, PriceSource::Persisted);
        assert_eq!(point.price, 42.0);
        assert_eq!(h.chain.reads(), 0);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_future_timestamp_rejected_without_io() {
        let h = harness(usdc_chain(), vec![static_pool()]);
        let future = unix_now() + 86_400;

        let result = h.resolver.resolve(token(), Network::Ethereum, future).await;
        assert!(matches!(result, Err(ResolveError::Validation(_))));
        assert_eq!(h.chain.reads(), 0);
        assert!(h.cache.is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_interpolates_between_persisted_days() {
        let h = harness(usdc_chain(), vec![static_pool()]);
        let day = |d| NaiveDate::from_ymd_opt(2023, 1, d).unwrap();
        for (d, price) in [(10, 5.0), (20, 15.0)] {
            h.store
                .insert(&PricePoint::new(
                    token(),
                    Network::Ethereum,
                    start_of_day(day(d)),
                    price,
                    PriceSource::Onchain,
                ))
                .await
                .unwrap();
        }

        let ts = start_of_day(day(15));
        let point = h.resolver.resolve(token(), Network::Ethereum, ts).await.unwrap();
        assert_eq!(point.source, PriceSource::Interpolated);
        assert!((point.price - 10.0).abs() < 1e-9);
        assert_eq!(h.chain.reads(), 0);
        // Interpolated prices are cached, not persisted
        assert_eq!(h.store.len(), 2);
        assert_eq!(h.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_uses_base_fee() {
        let h = harness(usdc_chain().base_fee(30_000_000_000), Vec::new());
        let point = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(100))
            .await
            .unwrap();
        assert_eq!(point.source, PriceSource::Fallback);
        assert!((point.price - 30.0).abs() < 1e-9);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_sentinel_without_base_fee() {
        let h = harness(usdc_chain(), Vec::new());
        let point = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(100))
            .await
            .unwrap();
        assert_eq!(point.source, PriceSource::Fallback);
        assert_eq!(point.price, 1.234);
    }

    #[tokio::test]
    async fn test_discovery_not_found_falls_back() {
        let mut h = harness(usdc_chain(), Vec::new());
        let cache: Arc<dyn Cache> = h.cache.clone();
        h.resolver = h.resolver.with_discovery(PoolDiscovery::new(
            Arc::new(EmptyIndex),
            cache,
            Network::Ethereum,
            references(),
        ));

        let point = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(100))
            .await
            .unwrap();
        assert_eq!(point.source, PriceSource::Fallback);
    }

    #[tokio::test]
    async fn test_discovery_outage_is_surfaced() {
        let mut h = harness(usdc_chain(), Vec::new());
        let cache: Arc<dyn Cache> = h.cache.clone();
        h.resolver = h.resolver.with_discovery(
            PoolDiscovery::new(Arc::new(DownIndex), cache, Network::Ethereum, references())
                .with_retry(RetryPolicy::no_retry()),
        );

        let err = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(100))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(FailureReason::Transient));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_pool_not_yet_deployed() {
        let chain = MockChain::with_blocks(GENESIS, SPACING, 1_000).pair(
            pool(),
            token(),
            usdc(),
            (1_000, 3_500_000),
            600,
        );
        let h = harness(chain, vec![static_pool()]);

        let err = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(550))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(FailureReason::NoDataForDate));
        assert!(err.to_string().contains("pool may not exist yet"));
        assert!(h.store.is_empty());
        assert!(h.cache.is_empty());
    }

    #[tokio::test]
    async fn test_weth_paired_pool_uses_native_feed() {
        // 10 tokens : 2 WETH, ETH at $2500 → $500 per token
        let chain = MockChain::with_blocks(GENESIS, SPACING, 1_000)
            .pair(
                pool(),
                weth(),
                token(),
                (2_000_000_000_000_000_000, 10_000_000_000_000_000_000),
                0,
            )
            .feed(Address::repeat_byte(0xdd), 250_000_000_000, GENESIS)
            .token(token(), Some(18), 0);
        let mapping = PoolMapping {
            paired_token: weth(),
            paired_type: PairedType::Weth,
            ..static_pool()
        };
        let h = harness(chain, vec![mapping]);
        let ts = at_block(500);

        let point = h.resolver.resolve(token(), Network::Ethereum, ts).await.unwrap();
        assert_eq!(point.source, PriceSource::Onchain);
        assert!((point.price - 500.0).abs() < 1e-9);

        let stored = h
            .store
            .find_exact(token(), Network::Ethereum, date_of(ts))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.source, PriceSource::Onchain);
        assert!((stored.price - 500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_token_missing_from_pool_is_surfaced() {
        // Base fee present: a fallthrough to tier 5 would succeed
        let chain = MockChain::with_blocks(GENESIS, SPACING, 1_000)
            .base_fee(30_000_000_000)
            .pair(pool(), weth(), usdc(), (1_000, 1_000), 0);
        let h = harness(chain, vec![static_pool()]);

        let err = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(100))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(FailureReason::UnsupportedPair));
        assert!(err.to_string().contains("not a constituent"));
        assert!(h.store.is_empty());
        assert!(h.cache.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_counter_asset_is_surfaced() {
        let other = Address::repeat_byte(0xee);
        let chain = MockChain::with_blocks(GENESIS, SPACING, 1_000)
            .base_fee(30_000_000_000)
            .pair(pool(), token(), other, (1_000, 1_000), 0);
        let h = harness(chain, vec![static_pool()]);

        let err = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(100))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(FailureReason::UnsupportedPair));
        assert_eq!(
            err.user_message(),
            "Paired token is not WETH or USDC; cannot compute USD price"
        );
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_date_before_genesis_has_no_data() {
        let h = harness(usdc_chain().base_fee(30_000_000_000), Vec::new());
        let err = h
            .resolver
            .resolve(token(), Network::Ethereum, GENESIS - 86_400)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(FailureReason::NoDataForDate));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_transient_failures() {
        let h = harness(usdc_chain().fail_next(100), vec![static_pool()]);
        let err = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(100))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_cache_outage_is_a_miss() {
        let h = harness_with(usdc_chain(), Arc::new(BrokenCache), vec![static_pool()]);
        let point = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(500))
            .await
            .unwrap();
        assert_eq!(point.source, PriceSource::Onchain);

        // Persisted on the first call, so the second is served by tier 2
        let again = h
            .resolver
            .resolve(token(), Network::Ethereum, at_block(500))
            .await
            .unwrap();
        assert_eq!(again.source, PriceSource::Persisted);
        assert_eq!(again.price, point.price);
    }

    #[test]
    fn test_discovery_errors_marking_no_pool() {
        assert!(DiscoveryError::NotFound(token()).is_no_pool());
    }
}
