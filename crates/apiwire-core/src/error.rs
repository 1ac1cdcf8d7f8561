//! Error types for the apiwire core library
//!
//! This module defines the error handling system shared by every stage of
//! the call pipeline, using thiserror for ergonomic error definitions and
//! anyhow for opaque causes.
//!
//! Errors fall into the families the pipeline cares about:
//! - configuration and validation errors are raised before any network call
//! - serialization errors carry the offending field and the inner cause
//! - transport errors survive the retry loop only once retries are spent
//! - API errors are routed HTTP responses carrying status, headers and body

use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthError;
use crate::http::TransportError;
use crate::response::ApiError;
use crate::union::UnionError;

/// Main error type for apiwire operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (unknown server, invalid retry settings, ...)
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Missing parameter keys or required values, raised before sending
    #[error("{message}")]
    Validation { field: String, message: String },

    /// Missing or invalid auth credentials
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A parameter or body could not be serialized
    #[error("{message}")]
    Serialization {
        field: Option<String>,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Connection failures and timeouts that outlived the retry policy
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The total retry wait time would exceed the configured ceiling
    #[error("Retry wait time exceeded: waited {elapsed:?}, maximum is {maximum:?}")]
    RetryTimeout {
        elapsed: Duration,
        maximum: Duration,
        status_code: Option<u16>,
    },

    /// The call was cancelled before it completed
    #[error("Request was cancelled")]
    Cancelled,

    /// A routed HTTP-level error
    #[error(transparent)]
    Api(#[from] Box<ApiError>),

    /// The response body could not be turned into the expected type
    #[error("Deserialization failed: {message}")]
    Deserialization {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// One-of / any-of resolution failures
    #[error(transparent)]
    Union(#[from] UnionError),

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a configuration error without a cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status of the response this error was built from, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api(api) => u16::try_from(api.status_code()).ok(),
            Error::RetryTimeout { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Whether the error is a transport failure rather than an HTTP response
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Whether the error is a routed HTTP-level error
    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api(_))
    }

    /// The routed API error, if this is one
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            _ => None,
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api(Box::new(err))
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
