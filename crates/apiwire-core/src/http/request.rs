//! Immutable outbound request descriptor
//!
//! An `HttpRequest` is produced by `RequestBuilder::build` and handed to the
//! transport by the call pipeline. Besides the resolved URL it keeps the URL
//! template, the template values and the query values it was derived from,
//! so `update_by_reference` can patch one of them and re-derive the URL.

use reqwest::Method;
use serde_json::Value;

use crate::http::body::RequestBody;
use crate::http::headers::Headers;
use crate::http::retry::RetryOption;
use crate::params::{self, ArraySerialization};
use crate::request::template;

/// A value substituted into a `{name}` placeholder of the URL template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateValue {
    pub value: Value,
    /// Whether the value is percent-encoded as a path segment
    pub encode: bool,
}

/// Outbound request descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    method: Method,
    url_template: String,
    template_values: Vec<(String, TemplateValue)>,
    query: Vec<(String, Value)>,
    array_serialization: ArraySerialization,
    url: String,
    headers: Headers,
    body: RequestBody,
    retry_option: RetryOption,
}

impl HttpRequest {
    /// Assemble a descriptor and derive its URL
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        method: Method,
        url_template: String,
        template_values: Vec<(String, TemplateValue)>,
        query: Vec<(String, Value)>,
        array_serialization: ArraySerialization,
        headers: Headers,
        body: RequestBody,
        retry_option: RetryOption,
    ) -> Self {
        let mut request = Self {
            method,
            url_template,
            template_values,
            query,
            array_serialization,
            url: String::new(),
            headers,
            body,
            retry_option,
        };
        request.url = request.derive_url();
        request
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL with template placeholders substituted and query appended
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn retry_option(&self) -> RetryOption {
        self.retry_option
    }

    pub fn array_serialization(&self) -> ArraySerialization {
        self.array_serialization
    }

    /// Query values in declaration order, before flattening
    pub fn query_parameters(&self) -> &[(String, Value)] {
        &self.query
    }

    pub fn template_values(&self) -> &[(String, TemplateValue)] {
        &self.template_values
    }

    /// Value of a single query parameter
    pub fn query_value(&self, name: &str) -> Option<&Value> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub(crate) fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub(crate) fn query_mut(&mut self) -> &mut Vec<(String, Value)> {
        &mut self.query
    }

    pub(crate) fn template_values_mut(&mut self) -> &mut Vec<(String, TemplateValue)> {
        &mut self.template_values
    }

    /// Recompute the URL from the template, template values and query
    pub(crate) fn refresh_url(&mut self) {
        self.url = self.derive_url();
    }

    fn derive_url(&self) -> String {
        let expanded = template::expand(&self.url_template, &self.template_values);
        let pairs = params::flatten_pairs(&self.query, self.array_serialization);
        params::append_query(&expanded, &pairs)
    }
}
