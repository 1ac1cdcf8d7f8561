//! Authentication managers and their composition
//!
//! Supports multiple authentication schemes:
//! - HTTP Basic credentials
//! - Bearer tokens
//! - API keys in a named header or query parameter
//! - any user type implementing [`AuthManager`]
//!
//! Managers are registered by name in the global configuration and combined
//! per call with [`AuthGroup`] expressions.

pub mod group;
pub mod managers;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::request::parts::RequestParts;

pub use group::AuthGroup;
pub use managers::{BasicAuthManager, BearerAuthManager, HeaderAuthManager, QueryAuthManager};

/// Named auth managers available to calls
pub type AuthRegistry = HashMap<String, Arc<dyn AuthManager>>;

/// A credential scheme that can check and apply itself to a request
pub trait AuthManager: Send + Sync {
    /// Check that every required credential is present
    fn validate(&self) -> Result<(), AuthError>;

    /// Write the credentials into the in-progress request
    fn apply(&self, parts: &mut RequestParts);
}

/// Missing or invalid credentials, with one reason per failing scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    reasons: Vec<String>,
}

impl AuthError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reasons: vec![reason.into()],
        }
    }

    /// Combine several failures, keeping their reasons in order
    pub fn aggregate(errors: impl IntoIterator<Item = AuthError>) -> Self {
        Self {
            reasons: errors.into_iter().flat_map(|e| e.reasons).collect(),
        }
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Missing required auth credentials:")?;
        for reason in &self.reasons {
            write!(f, "\n-> {}", reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for AuthError {}
