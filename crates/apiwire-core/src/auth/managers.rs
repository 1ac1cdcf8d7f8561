//! Built-in auth managers

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::auth::{AuthError, AuthManager};
use crate::request::parts::RequestParts;

/// HTTP Basic authentication (`Authorization: Basic base64(user:pass)`)
#[derive(Debug, Clone, Default)]
pub struct BasicAuthManager {
    username: Option<String>,
    password: Option<String>,
}

impl BasicAuthManager {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(Some(username.into()), Some(password.into()))
    }
}

impl AuthManager for BasicAuthManager {
    fn validate(&self) -> Result<(), AuthError> {
        let mut missing = Vec::new();
        if self.username.is_none() {
            missing.push("`username`");
        }
        if self.password.is_none() {
            missing.push("`password`");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuthError::new(format!(
                "Basic authentication is missing {}",
                missing.join(" and ")
            )))
        }
    }

    fn apply(&self, parts: &mut RequestParts) {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            let token = STANDARD.encode(format!("{}:{}", username, password));
            parts.headers.insert("Authorization", format!("Basic {}", token));
        }
    }
}

/// Bearer token authentication (`Authorization: Bearer <token>`)
#[derive(Debug, Clone, Default)]
pub struct BearerAuthManager {
    token: Option<String>,
}

impl BearerAuthManager {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Read the token from an environment variable
    pub fn from_env(var: &str) -> Self {
        Self {
            token: std::env::var(var).ok(),
        }
    }
}

impl AuthManager for BearerAuthManager {
    fn validate(&self) -> Result<(), AuthError> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(AuthError::new("Bearer authentication is missing `access token`")),
        }
    }

    fn apply(&self, parts: &mut RequestParts) {
        if let Some(token) = &self.token {
            parts.headers.insert("Authorization", format!("Bearer {}", token));
        }
    }
}

/// API key sent in a named header
#[derive(Debug, Clone)]
pub struct HeaderAuthManager {
    header: String,
    value: Option<String>,
}

impl HeaderAuthManager {
    pub fn new(header: impl Into<String>, value: Option<String>) -> Self {
        Self {
            header: header.into(),
            value,
        }
    }

    /// Read the header value from an environment variable
    pub fn from_env(header: impl Into<String>, var: &str) -> Self {
        Self::new(header, std::env::var(var).ok())
    }
}

impl AuthManager for HeaderAuthManager {
    fn validate(&self) -> Result<(), AuthError> {
        match self.value {
            Some(_) => Ok(()),
            None => Err(AuthError::new(format!("`{}` header is not set", self.header))),
        }
    }

    fn apply(&self, parts: &mut RequestParts) {
        if let Some(value) = &self.value {
            parts.headers.insert(self.header.as_str(), value.as_str());
        }
    }
}

/// API key sent as a named query parameter
#[derive(Debug, Clone)]
pub struct QueryAuthManager {
    name: String,
    value: Option<String>,
}

impl QueryAuthManager {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl AuthManager for QueryAuthManager {
    fn validate(&self) -> Result<(), AuthError> {
        match self.value {
            Some(_) => Ok(()),
            None => Err(AuthError::new(format!(
                "`{}` query parameter is not set",
                self.name
            ))),
        }
    }

    fn apply(&self, parts: &mut RequestParts) {
        if let Some(value) = &self.value {
            parts.set_query(self.name.as_str(), Value::String(value.clone()));
        }
    }
}
