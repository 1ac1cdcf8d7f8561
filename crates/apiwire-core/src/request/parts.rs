//! Mutable request state assembled before `build`

use std::collections::HashSet;

use serde_json::Value;

use crate::http::body::{FileStream, RequestBody};
use crate::http::headers::Headers;
use crate::http::request::TemplateValue;

/// Value of a single form field
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Value(Value),
    File(FileStream),
}

/// One form field; keys may repeat
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub key: String,
    pub value: FormValue,
    pub content_type: Option<String>,
}

/// In-progress request state written by parameters and auth managers.
///
/// Keys written by explicit single parameters are tracked so bulk
/// "additional" entries never replace them.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    pub headers: Headers,
    pub query: Vec<(String, Value)>,
    pub template_values: Vec<(String, TemplateValue)>,
    pub form: Vec<FormField>,
    pub body: RequestBody,
    /// Whether body content types are filled in when no header sets one
    pub default_content_type: bool,
    explicit_query: HashSet<String>,
    explicit_headers: HashSet<String>,
    explicit_form: HashSet<String>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self {
            default_content_type: true,
            ..Default::default()
        }
    }

    /// Set a template value, replacing an earlier one with the same name
    pub fn set_template(&mut self, name: impl Into<String>, value: TemplateValue) {
        let name = name.into();
        match self.template_values.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.template_values.push((name, value)),
        }
    }

    /// Set a query value, replacing an earlier one with the same name
    pub fn set_query(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.query.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.query.push((name, value)),
        }
    }

    pub(crate) fn set_explicit_query(&mut self, name: &str, value: Value) {
        self.explicit_query.insert(name.to_string());
        self.set_query(name, value);
    }

    /// Bulk query entry; dropped when an explicit parameter owns the key
    pub(crate) fn merge_query(&mut self, name: &str, value: Value) {
        if !self.explicit_query.contains(name) {
            self.set_query(name, value);
        }
    }

    pub(crate) fn set_explicit_header(&mut self, name: &str, value: String) {
        self.explicit_headers.insert(name.to_ascii_lowercase());
        self.headers.insert(name, value);
    }

    pub(crate) fn merge_header(&mut self, name: &str, value: String) {
        if !self.explicit_headers.contains(&name.to_ascii_lowercase()) {
            self.headers.insert(name, value);
        }
    }

    pub(crate) fn push_explicit_form(&mut self, field: FormField) {
        self.explicit_form.insert(field.key.clone());
        self.form.push(field);
    }

    pub(crate) fn merge_form(&mut self, field: FormField) {
        if !self.explicit_form.contains(&field.key) {
            self.form.push(field);
        }
    }
}
