//! Historical token price resolution.
//!
//! This crate provides the domain side of the price history service:
//! - Price points, pool mappings and request validation
//! - Cache and persisted-history capabilities, in-process and SQLite-backed
//! - Linear interpolation between persisted days
//! - Pool discovery through a liquidity index
//! - The tiered resolver (cache, persisted, interpolated, on-chain, fallback)
//! - Day-by-day backfill and its job worker
//! - TOML configuration

mod backfill;
mod cache;
pub mod config;
mod discovery;
mod error;
mod interpolate;
mod resolver;
mod store;
mod types;
mod worker;

pub use backfill::{BackfillReport, BackfillWalker, CreationDateLookup};
pub use cache::{pool_key, price_key, Cache, MemoryCache};
pub use config::{load_config, AppConfig};
pub use discovery::{select_pool, PoolDiscovery, DEFAULT_POOL_CACHE_TTL};
pub use error::{CacheError, DiscoveryError, FailureReason, ResolveError, StoreError};
pub use interpolate::interpolate;
pub use resolver::{PriceResolver, ResolvePrice, ResolverSettings, TierOutcome};
pub use store::{MemoryPriceStore, PriceStore, SqlitePriceStore};
pub use types::{
    date_of, noon_of, start_of_day, unix_now, BackfillJob, PoolMapping, PriceRequest,
    PriceResponse, PricePoint, PriceSource,
};
pub use worker::{
    BackfillQueue, BackfillWorker, JobId, JobRegistry, JobStatus, QueueError,
    DEFAULT_STATUS_RETENTION,
};
