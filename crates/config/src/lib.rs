//! Reflex - Configuration
//!
//! Loading, preparation and live reload of the rule set.
//!
//! # Load path
//!
//! ```text
//! (-p provider, -c path) --> parse_path --> Location
//!                                             |
//!                                  source_for(provider, location)
//!                                             |
//!                        fetch --> decode (yaml/json/toml) --> prepare
//! ```
//!
//! `prepare` fills defaults, merges common parameter bundles, resolves
//! executors and compiles rule conditions; the result is published
//! through a [`ConfigHandle`] whose readers take one atomic snapshot per
//! payload. Only the reload worker ever swaps the slot.

mod error;
mod handle;
mod path;
mod reload;
mod source;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use reflex_executor::{ExecutorRegistry, Params};
use reflex_model::{prepare_rules, Rule};

pub use error::{ConfigError, Result};
pub use handle::ConfigHandle;
pub use path::{parse_path, Location, Provider, DEFAULT_EXTENSION};
pub use reload::{spawn_reload_worker, ReloadWorker};
pub use source::{source_for, ConfigSource, ConsulSource, EtcdSource, FileSource};

/// Default blocker cache budget: 50 MiB.
pub const DEFAULT_BLOCK_CACHE_SIZE: usize = 50 * 1024 * 1024;
/// Default task-group queue depth.
pub const DEFAULT_POOL_SIZE: usize = 100;
/// Default worker count.
pub const DEFAULT_RUNNERS: usize = 10;

/// Service configuration: common settings plus the rule set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Blocker cache budget in bytes (default 50 MiB).
    pub block_cache_size: usize,

    /// Task-group queue depth (default 100).
    pub pool_size: usize,

    /// Worker count (default 10).
    pub runners: usize,

    /// Remote refresh period; zero disables the reload daemon.
    #[serde(with = "humantime_serde")]
    pub remote_config_refresh_interval: Duration,

    /// Named parameter bundles referenced by actions.
    pub common_parameters: BTreeMap<String, Params>,

    /// The declarative rule set.
    pub rules: Vec<Rule>,
}

impl Config {
    /// Decode raw config bytes according to the path extension.
    pub fn decode(bytes: &[u8], extension: &str) -> Result<Self> {
        match extension {
            "yaml" | "yml" => Ok(serde_yaml::from_slice(bytes)?),
            "json" => Ok(serde_json::from_slice(bytes)?),
            "toml" => {
                let text = std::str::from_utf8(bytes).map_err(|_| ConfigError::InvalidEncoding)?;
                Ok(toml::from_str(text)?)
            }
            other => Err(ConfigError::UnsupportedExtension(other.to_owned())),
        }
    }

    /// Fill defaults and prepare the rule set against the registry.
    pub fn prepare(&mut self, registry: &ExecutorRegistry) -> Result<()> {
        self.fill_defaults();
        prepare_rules(&mut self.rules, &self.common_parameters, registry)?;
        Ok(())
    }

    fn fill_defaults(&mut self) {
        if self.block_cache_size == 0 {
            self.block_cache_size = DEFAULT_BLOCK_CACHE_SIZE;
        }
        if self.pool_size == 0 {
            self.pool_size = DEFAULT_POOL_SIZE;
        }
        if self.runners == 0 {
            self.runners = DEFAULT_RUNNERS;
        }
    }
}

/// Fetch, decode and prepare a configuration in one go.
pub async fn load(
    source: &dyn ConfigSource,
    extension: &str,
    registry: &ExecutorRegistry,
) -> Result<Config> {
    let bytes = source.fetch().await?;
    let mut config = Config::decode(&bytes, extension)?;
    config.prepare(registry)?;

    tracing::debug!(
        source = %source.describe(),
        rules = config.rules.len(),
        "configuration loaded"
    );

    Ok(config)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
