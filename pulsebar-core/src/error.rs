//! Error types.
//!
//! None of these cross the polling loop: fetch errors are turned into a
//! degraded state by [`Degrading`](crate::module::Degrading) and action
//! errors are only logged.

use std::time::Duration;

use thiserror::Error;

/// Failure to obtain fresh state from an external source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("command `{command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("command `{command}` failed: {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}

/// Failure to load the bar configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    #[error("module `{name}`: {reason}")]
    Module { name: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Invalid(Box::new(e))
    }
}

/// A color string that is not `#rgb` or `#rrggbb`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color `{0}`: expected #rgb or #rrggbb")]
pub struct ColorError(pub String);
