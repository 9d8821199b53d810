use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 16;
/// Upper bound accepted for `max_chain_length`.
pub const MAX_CHAIN_LENGTH_LIMIT: usize = 64;
/// Upper bound accepted for `eviction_interval`.
pub const MAX_EVICTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How often the sweepers purge expired entries. Anything below one
    /// second is raised to one second when the cache is built.
    pub eviction_interval: Duration,

    /// Maximum number of alias hops followed by a single lookup
    pub max_chain_length: usize,

    /// Run the sweepers as tasks on the Tokio runtime current at
    /// construction instead of on their own threads. The runtime must then
    /// outlive the cache.
    pub runtime_sweepers: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
            runtime_sweepers: false,
        }
    }
}

/// On-disk form; every key is optional and falls back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheConfigFile {
    eviction_interval_secs: Option<u64>,
    max_chain_length: Option<usize>,
    runtime_sweepers: Option<bool>,
}

impl CacheConfig {
    /// Defaults overridden by `RRCACHE_EVICTION_INTERVAL` (seconds),
    /// `RRCACHE_MAX_CHAIN_LENGTH` and `RRCACHE_RUNTIME_SWEEPERS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(interval) = lookup("RRCACHE_EVICTION_INTERVAL") {
            let secs = interval
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidEvictionInterval(interval.clone()))?;
            config.eviction_interval = Duration::from_secs(secs);
        }

        if let Some(length) = lookup("RRCACHE_MAX_CHAIN_LENGTH") {
            config.max_chain_length = length
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidChainLength(length.clone()))?;
        }

        if let Some(flag) = lookup("RRCACHE_RUNTIME_SWEEPERS") {
            config.runtime_sweepers = flag.trim().parse::<bool>().map_err(|_| {
                ConfigError::ParseError(format!("RRCACHE_RUNTIME_SWEEPERS: {flag}"))
            })?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document such as:
    ///
    /// ```toml
    /// eviction_interval_secs = 30
    /// max_chain_length = 8
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: CacheConfigFile = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(secs) = file.eviction_interval_secs {
            config.eviction_interval = Duration::from_secs(secs);
        }
        if let Some(length) = file.max_chain_length {
            config.max_chain_length = length;
        }
        if let Some(flag) = file.runtime_sweepers {
            config.runtime_sweepers = flag;
        }

        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.eviction_interval > MAX_EVICTION_INTERVAL {
            return Err(ConfigError::InvalidEvictionInterval(format!(
                "{:?} is too large (max {:?})",
                self.eviction_interval, MAX_EVICTION_INTERVAL
            )));
        }

        if self.max_chain_length == 0 || self.max_chain_length > MAX_CHAIN_LENGTH_LIMIT {
            return Err(ConfigError::InvalidChainLength(format!(
                "{} is out of range (1..={})",
                self.max_chain_length, MAX_CHAIN_LENGTH_LIMIT
            )));
        }

        Ok(())
    }
}
