//! AND / OR composition of named auth schemes

use crate::auth::{AuthError, AuthRegistry};
use crate::request::parts::RequestParts;

/// Auth requirement of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthGroup {
    /// A single registered scheme
    Single(String),
    /// Every child must validate
    And(Vec<AuthGroup>),
    /// At least one child must validate
    Or(Vec<AuthGroup>),
}

impl AuthGroup {
    pub fn single(name: impl Into<String>) -> Self {
        AuthGroup::Single(name.into())
    }

    pub fn and(children: impl IntoIterator<Item = AuthGroup>) -> Self {
        AuthGroup::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = AuthGroup>) -> Self {
        AuthGroup::Or(children.into_iter().collect())
    }

    /// Validate the expression and apply the managers it selects.
    ///
    /// Nothing is written to `parts` unless the whole expression validates.
    pub fn apply(&self, registry: &AuthRegistry, parts: &mut RequestParts) -> Result<(), AuthError> {
        let selected = self.select(registry)?;
        for name in selected {
            if let Some(manager) = registry.get(name) {
                manager.apply(parts);
            }
        }
        Ok(())
    }

    /// Names of the schemes to apply, depth first in declaration order
    fn select<'a>(&'a self, registry: &AuthRegistry) -> Result<Vec<&'a str>, AuthError> {
        match self {
            AuthGroup::Single(name) => {
                let manager = registry.get(name).ok_or_else(|| {
                    AuthError::new(format!("`{}` is not a registered auth scheme", name))
                })?;
                manager.validate()?;
                Ok(vec![name.as_str()])
            }
            AuthGroup::And(children) => {
                let mut selected = Vec::new();
                for child in children {
                    selected.extend(child.select(registry)?);
                }
                Ok(selected)
            }
            AuthGroup::Or(children) => {
                let mut selected = Vec::new();
                let mut failures = Vec::new();
                for child in children {
                    match child.select(registry) {
                        Ok(names) => selected.extend(names),
                        Err(err) => failures.push(err),
                    }
                }
                if selected.is_empty() && !failures.is_empty() {
                    tracing::debug!(failures = failures.len(), "no auth alternative validated");
                    return Err(AuthError::aggregate(failures));
                }
                Ok(selected)
            }
        }
    }
}
