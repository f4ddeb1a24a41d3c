//! Configuration: resolver parameters, retry policy, discovery, backfill
//! worker, price store and per-network endpoints, reference assets and static pools.

mod app;
mod loader;
mod network;

pub use app::{
    AppConfig, BackfillConfig, DiscoveryConfig, ResolverConfig, RetryConfig, StoreConfig,
};
pub use loader::{
    config_path, expand_env, has_unexpanded, load_config, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};
pub use network::{NetworkConfig, ReferenceConfig, StaticPool};
