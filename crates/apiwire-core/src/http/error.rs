//! Transport failure classification
//!
//! Failures that never produced an HTTP response. All kinds except
//! `InvalidRequest` are eligible for a retry and, once retries are spent,
//! surface as `Error::Transport`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportErrorKind {
    /// The per-call timeout elapsed
    Timeout,
    /// The connection could not be established
    Connect,
    /// The request could not be written
    Request,
    /// The request could not be assembled (bad header, URL or part type);
    /// resending cannot succeed
    InvalidRequest,
    /// The response body could not be read
    Body,
    /// Anything the transport could not classify
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Connect => write!(f, "connection failure"),
            TransportErrorKind::Request => write!(f, "request failure"),
            TransportErrorKind::InvalidRequest => write!(f, "invalid request"),
            TransportErrorKind::Body => write!(f, "body failure"),
            TransportErrorKind::Other => write!(f, "transport failure"),
        }
    }
}

/// A failure reported by a `Transport` implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create from a reqwest error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else if error.is_body() || error.is_decode() {
            TransportErrorKind::Body
        } else if error.is_builder() {
            TransportErrorKind::InvalidRequest
        } else if error.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };

        Self {
            kind,
            message: error.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        self.kind != TransportErrorKind::InvalidRequest
    }
}
