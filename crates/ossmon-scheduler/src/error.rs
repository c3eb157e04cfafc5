//! Startup error types.

use std::net::SocketAddr;

use thiserror::Error;

use ossmon_cms::ClientError;
use ossmon_core::ConfigError;

/// Errors that stop the exporter from starting. There is no degraded
/// mode: any of these ends the process.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("environment {env}: {source}")]
    Client {
        env: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("supervisor already started")]
    AlreadyStarted,
}

pub type FatalResult<T> = Result<T, FatalError>;
