//! Persisted price history capability with in-process and SQLite
//! implementations.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use pricehistory_chain::Network;

use crate::{PricePoint, StoreError};

mod sqlite;

pub use sqlite::SqlitePriceStore;

/// Daily price history, unique per `(token, network, date)`.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Point stored for exactly `date`.
    async fn find_exact(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError>;

    /// Latest point dated at or before `date`.
    async fn find_nearest_before(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError>;

    /// Earliest point dated at or after `date`.
    async fn find_nearest_after(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError>;

    /// Insert unless a point already exists for the same date.
    ///
    /// Returns `true` if the point was written, `false` if one was already there.
    async fn insert(&self, point: &PricePoint) -> Result<bool, StoreError>;
}

type Key = (Address, Network, NaiveDate);

/// In-process price store.
#[derive(Debug, Default)]
pub struct MemoryPriceStore {
    points: RwLock<BTreeMap<Key, PricePoint>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// All points of a token, oldest first.
    pub fn history(&self, token: Address, network: Network) -> Vec<PricePoint> {
        self.points
            .read()
            .range((token, network, NaiveDate::MIN)..=(token, network, NaiveDate::MAX))
            .map(|(_, point)| *point)
            .collect()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn find_exact(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError> {
        Ok(self.points.read().get(&(token, network, date)).copied())
    }

    async fn find_nearest_before(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError> {
        Ok(self
            .points
            .read()
            .range((token, network, NaiveDate::MIN)..=(token, network, date))
            .next_back()
            .map(|(_, point)| *point))
    }

    async fn find_nearest_after(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError> {
        Ok(self
            .points
            .read()
            .range((token, network, date)..=(token, network, NaiveDate::MAX))
            .next()
            .map(|(_, point)| *point))
    }

    async fn insert(&self, point: &PricePoint) -> Result<bool, StoreError> {
        let normalized = point.for_date();
        let key = (normalized.token, normalized.network, normalized.date());
        let mut points = self.points.write();
        if points.contains_key(&key) {
            return Ok(false);
        }
        points.insert(key, normalized);
        Ok(true)
    }
}
