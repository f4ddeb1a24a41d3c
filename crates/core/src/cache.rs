//! Key-value cache capability and an in-process implementation.

use std::time::{Duration, Instant};

use alloy::primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use pricehistory_chain::Network;

use crate::CacheError;

/// String key-value cache with per-entry TTL.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// Cache key of a resolved price.
pub fn price_key(token: Address, network: Network, timestamp: u64) -> String {
    format!("price:{token:#x}:{network}:{timestamp}")
}

/// Cache key of a discovered pool mapping.
pub fn pool_key(token: Address) -> String {
    format!("uniswapv2:pool:{token:#x}")
}

/// In-process cache backed by a concurrent map.
///
/// Expired entries are dropped lazily on read and by [`MemoryCache::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (value, expires_at) = entry.value();
            if *expires_at > now {
                return Ok(Some(value.clone()));
            }
        }
        self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let token: Address = "0x6B175474E89094C44Da98b954EedeAC495271d0F".parse().unwrap();
        assert_eq!(
            price_key(token, Network::Ethereum, 1_600_000_000),
            "price:0x6b175474e89094c44da98b954eedeac495271d0f:ethereum:1600000000"
        );
        assert_eq!(
            pool_key(token),
            "uniswapv2:pool:0x6b175474e89094c44da98b954eedeac495271d0f"
        );
    }

    #[tokio::test]
    async fn test_get_set() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("a").await.unwrap(), None);

        cache
            .set("a", "1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let cache = MemoryCache::new();
        cache.set("a", "1".to_string(), Duration::ZERO).await.unwrap();
        cache
            .set("b", "2".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
    }
}
