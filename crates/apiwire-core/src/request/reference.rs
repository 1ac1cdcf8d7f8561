//! Patching built requests by reference
//!
//! References address one value of a built request:
//! `$request.headers#/<name>`, `$request.query#/<name>[/<nested>...]` and
//! `$request.template#/<name>[/<nested>...]`.

use serde_json::Value;

use crate::http::request::HttpRequest;
use crate::params::value_to_string;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Headers,
    Query,
    Template,
}

fn parse(reference: &str) -> Result<(Target, &str, &str)> {
    let invalid = || Error::configuration(format!("Invalid request reference `{}`", reference));

    let (prefix, pointer) = reference.split_once('#').ok_or_else(invalid)?;
    let target = match prefix {
        "$request.headers" => Target::Headers,
        "$request.query" => Target::Query,
        "$request.template" => Target::Template,
        _ => return Err(invalid()),
    };

    let pointer = pointer.strip_prefix('/').ok_or_else(invalid)?;
    let (name, nested) = match pointer.find('/') {
        Some(index) => pointer.split_at(index),
        None => (pointer, ""),
    };
    if name.is_empty() {
        return Err(invalid());
    }
    Ok((target, name, nested))
}

/// Replace the value at `nested` (a JSON pointer, empty for the root)
fn patch(value: &mut Value, nested: &str, update: impl FnOnce(Value) -> Value) -> bool {
    let slot = if nested.is_empty() {
        Some(value)
    } else {
        value.pointer_mut(nested)
    };
    match slot {
        Some(slot) => {
            *slot = update(slot.take());
            true
        }
        None => false,
    }
}

impl HttpRequest {
    /// Copy of this request with one addressed value replaced by `update`.
    ///
    /// The URL is re-derived afterwards. A reference to a value the request
    /// does not carry leaves the copy unchanged; a malformed reference is a
    /// configuration error.
    pub fn update_by_reference<F>(&self, reference: &str, update: F) -> Result<HttpRequest>
    where
        F: FnOnce(Value) -> Value,
    {
        let (target, name, nested) = parse(reference)?;
        let mut updated = self.clone();

        let changed = match target {
            Target::Headers => match updated.headers().get(name).map(str::to_string) {
                Some(current) if nested.is_empty() => {
                    let replacement = update(Value::String(current));
                    updated
                        .headers_mut()
                        .insert(name, value_to_string(&replacement));
                    true
                }
                _ => false,
            },
            Target::Query => updated
                .query_mut()
                .iter_mut()
                .find(|(key, _)| key == name)
                .is_some_and(|(_, value)| patch(value, nested, update)),
            Target::Template => updated
                .template_values_mut()
                .iter_mut()
                .find(|(key, _)| key == name)
                .is_some_and(|(_, template)| patch(&mut template.value, nested, update)),
        };

        if changed {
            updated.refresh_url();
        } else {
            tracing::debug!(reference, "reference did not address a value; request unchanged");
        }
        Ok(updated)
    }
}
