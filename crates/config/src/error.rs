//! Configuration error types

use thiserror::Error;

use reflex_model::RuleError;

use crate::path::Provider;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when resolving, fetching or preparing
/// configuration.
///
/// All of these are fatal at startup. During a reload iteration they are
/// logged and the previous configuration stays live.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a local configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Unknown `-p` provider value
    #[error("unsupported config provider {0}")]
    UnsupportedProvider(String),

    /// Extension does not map to a known decoder
    #[error("unsupported config extension {0}")]
    UnsupportedExtension(String),

    /// Path shape does not fit the provider (e.g. a URL for `file`)
    #[error("incorrect path for provider {0}")]
    IncorrectPath(Provider),

    /// Remote provider without an endpoint
    #[error("empty endpoint for provider {0}")]
    EmptyEndpoint(Provider),

    /// Path is not a parsable URL
    #[error("invalid config path {path}: {reason}")]
    InvalidPath {
        /// The raw path argument
        path: String,
        /// Parser failure text
        reason: String,
    },

    /// Remote store has no value under the configured key
    #[error("remote config key {key} not found")]
    KeyNotFound {
        /// Key path within the store
        key: String,
    },

    /// Transport failure talking to a remote provider
    #[error("config fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Config payload is not UTF-8 (TOML only)
    #[error("config payload is not valid UTF-8")]
    InvalidEncoding,

    /// YAML decode failure
    #[error("failed to parse yaml config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON decode failure
    #[error("failed to parse json config: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML decode failure
    #[error("failed to parse toml config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Rule preparation failure
    #[error(transparent)]
    Rule(#[from] RuleError),
}
