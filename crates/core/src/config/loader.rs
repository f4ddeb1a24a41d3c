//! Configuration file loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{AppConfig, StoreConfig};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "PRICEHISTORY_CONFIG";

/// Path used when neither `--config` nor `PRICEHISTORY_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Pick the config path: explicit argument, then environment, then default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load a TOML config file and expand `${VAR}` references in endpoints.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading configuration");

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let mut config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;

    config.expand_env_vars()?;
    config
        .configured_networks()
        .with_context(|| format!("Invalid networks in {:?}", path))?;
    Ok(config)
}

impl AppConfig {
    /// Expand environment variables in endpoint values.
    pub fn expand_env_vars(&mut self) -> Result<()> {
        for (name, network) in self.networks.iter_mut() {
            network.rpc_url = expand_env(&network.rpc_url)?;
            if has_unexpanded(&network.rpc_url) {
                warn!(network = %name, rpc_url = %network.rpc_url, "RPC URL references an unset variable");
            }
        }
        if let Some(discovery) = self.discovery.as_mut() {
            discovery.subgraph_url = expand_env(&discovery.subgraph_url)?;
        }
        if let StoreConfig::Sqlite { url } = &mut self.store {
            *url = expand_env(url)?;
        }
        Ok(())
    }
}

/// Expand `${VAR_NAME}` patterns with environment variable values.
///
/// Unset variables are left as written.
pub fn expand_env(s: &str) -> Result<String> {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}").context("Invalid env pattern")?;
    let mut result = s.to_string();

    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            if let Ok(value) = std::env::var(var_match.as_str()) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }

    Ok(result)
}

/// Whether `s` still holds a `${VAR}` reference.
pub fn has_unexpanded(s: &str) -> bool {
    s.contains("${")
}
