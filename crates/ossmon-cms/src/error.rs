//! CloudMonitor client error types.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

pub type FetchResult<T> = Result<T, FetchError>;

/// Errors building a client. These mean the credential or endpoint
/// material is unusable, so callers treat them as fatal.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid region: {0:?}")]
    InvalidRegion(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Errors from a single metric fetch. Never fatal; the scheduler logs
/// them and keeps the previous gauge values.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected http status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("api error {code}: {message}")]
    Api { code: String, message: String },

    #[error("response has no Datapoints field")]
    MissingDatapoints,

    #[error("cannot decode response: {0}")]
    Decode(#[from] serde_json::Error),
}
