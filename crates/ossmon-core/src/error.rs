//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating the exporter config.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
