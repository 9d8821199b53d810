use thiserror::Error;

/// Errors raised while building a [`crate::config::CacheConfig`].
///
/// Cache operations themselves cannot fail: a miss is an empty lookup and an
/// unusable record is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid eviction interval: {0}")]
    InvalidEvictionInterval(String),

    #[error("Invalid alias chain length: {0}")]
    InvalidChainLength(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
