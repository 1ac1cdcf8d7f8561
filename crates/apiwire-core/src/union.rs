//! One-of / any-of response unions
//!
//! A [`UnionType`] tries a list of candidate parsers against one JSON value.
//! One-of requires exactly one candidate to accept the value; any-of takes
//! the first candidate that does. When a discriminator field is configured
//! and present, the candidate registered for its value is tried first.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

type ParseFn<T> = Arc<dyn Fn(&Value) -> std::result::Result<T, String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    OneOf,
    AnyOf,
}

/// Union resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnionError {
    #[error("could not match any acceptable type from {candidates} on: {value}")]
    NoMatch { candidates: String, value: String },

    #[error("there are more than one matching types i.e. {matched} on: {value}")]
    MoreThanOne { matched: String, value: String },
}

/// One acceptable shape of a union
pub struct Candidate<T> {
    name: String,
    parse: ParseFn<T>,
    discriminator_value: Option<String>,
}

impl<T> Candidate<T> {
    pub fn new<F>(name: impl Into<String>, parse: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parse: Arc::new(parse),
            discriminator_value: None,
        }
    }

    /// Candidate that deserializes `U` with serde and wraps it into `T`
    pub fn serde<U, W>(name: impl Into<String>, wrap: W) -> Self
    where
        U: DeserializeOwned,
        W: Fn(U) -> T + Send + Sync + 'static,
    {
        Self::new(name, move |value: &Value| {
            serde_json::from_value::<U>(value.clone())
                .map(&wrap)
                .map_err(|e| e.to_string())
        })
    }

    /// Register the discriminator value selecting this candidate
    pub fn discriminated_by(mut self, value: impl Into<String>) -> Self {
        self.discriminator_value = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Candidate<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            parse: Arc::clone(&self.parse),
            discriminator_value: self.discriminator_value.clone(),
        }
    }
}

impl<T> fmt::Debug for Candidate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("discriminator_value", &self.discriminator_value)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UnionType<T> {
    kind: UnionKind,
    candidates: Vec<Candidate<T>>,
    discriminator: Option<String>,
}

impl<T> UnionType<T> {
    pub fn one_of(candidates: Vec<Candidate<T>>) -> Self {
        Self {
            kind: UnionKind::OneOf,
            candidates,
            discriminator: None,
        }
    }

    pub fn any_of(candidates: Vec<Candidate<T>>) -> Self {
        Self {
            kind: UnionKind::AnyOf,
            candidates,
            discriminator: None,
        }
    }

    /// Object field whose value names the candidate to use
    pub fn discriminator(mut self, field: impl Into<String>) -> Self {
        self.discriminator = Some(field.into());
        self
    }

    pub fn kind(&self) -> UnionKind {
        self.kind
    }

    /// Run every candidate against `value`, in declaration order
    pub fn trial(&self, value: &Value) -> Vec<(&str, std::result::Result<T, String>)> {
        self.candidates
            .iter()
            .map(|candidate| (candidate.name.as_str(), (candidate.parse)(value)))
            .collect()
    }

    pub fn resolve(&self, value: &Value) -> std::result::Result<T, UnionError> {
        if let Some(resolved) = self.resolve_discriminated(value) {
            return Ok(resolved);
        }

        let mut matched: Vec<(&str, T)> = Vec::new();
        for (name, outcome) in self.trial(value) {
            match outcome {
                Ok(parsed) => {
                    if self.kind == UnionKind::AnyOf {
                        return Ok(parsed);
                    }
                    matched.push((name, parsed));
                }
                Err(reason) => {
                    tracing::trace!(candidate = name, %reason, "union candidate rejected");
                }
            }
        }

        match matched.len() {
            0 => Err(UnionError::NoMatch {
                candidates: self.candidate_names(),
                value: value.to_string(),
            }),
            1 => Ok(matched.remove(0).1),
            _ => Err(UnionError::MoreThanOne {
                matched: matched
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
                value: value.to_string(),
            }),
        }
    }

    /// Parse a response body and resolve it
    pub fn parse_str(&self, text: &str) -> crate::Result<T> {
        let value: Value = serde_json::from_str(text)?;
        Ok(self.resolve(&value)?)
    }

    fn resolve_discriminated(&self, value: &Value) -> Option<T> {
        let field = self.discriminator.as_deref()?;
        let tag = value.get(field)?.as_str()?;
        let candidate = self
            .candidates
            .iter()
            .find(|c| c.discriminator_value.as_deref() == Some(tag))?;

        match (candidate.parse)(value) {
            Ok(parsed) => Some(parsed),
            Err(reason) => {
                tracing::debug!(
                    discriminator = tag,
                    candidate = %candidate.name,
                    %reason,
                    "discriminated candidate rejected value, trying all candidates"
                );
                None
            }
        }
    }

    fn candidate_names(&self) -> String {
        self.candidates
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
