//! Routed HTTP-level errors

use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::headers::Headers;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::{Error, Result};

/// Kind tag of errors built by the default factory
pub const DEFAULT_ERROR_KIND: &str = "ApiError";

/// The exchange an error is being built from.
///
/// Bodies are parsed as JSON at most once, on first use.
#[derive(Debug)]
pub struct ExceptionContext<'a> {
    request: &'a HttpRequest,
    response: &'a HttpResponse,
    response_json: OnceLock<Option<Value>>,
    request_json: OnceLock<Option<Value>>,
}

impl<'a> ExceptionContext<'a> {
    pub fn new(request: &'a HttpRequest, response: &'a HttpResponse) -> Self {
        Self {
            request,
            response,
            response_json: OnceLock::new(),
            request_json: OnceLock::new(),
        }
    }

    pub fn request(&self) -> &HttpRequest {
        self.request
    }

    pub fn response(&self) -> &HttpResponse {
        self.response
    }

    /// Response body as JSON, `None` when empty or not JSON
    pub fn response_json(&self) -> Option<&Value> {
        self.response_json
            .get_or_init(|| self.response.json())
            .as_ref()
    }

    /// Request body as JSON, `None` when absent or not JSON
    pub fn request_json(&self) -> Option<&Value> {
        self.request_json
            .get_or_init(|| {
                self.request
                    .body()
                    .as_text()
                    .and_then(|text| serde_json::from_str(text).ok())
            })
            .as_ref()
    }
}

/// An HTTP response routed to an error.
///
/// Carries a kind tag naming the declared error case, the rendered message
/// and a snapshot of the response. Case-specific fields are read from the
/// parsed body with [`ApiError::field`] or [`ApiError::extract`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: String,
    message: String,
    status_code: i32,
    headers: Headers,
    body: Vec<u8>,
    data: Option<Value>,
}

impl ApiError {
    /// Error built from a response, with the parsed JSON body as data
    pub fn from_context(message: impl Into<String>, context: &ExceptionContext<'_>) -> Self {
        let response = context.response();
        Self {
            kind: DEFAULT_ERROR_KIND.to_string(),
            message: message.into(),
            status_code: i32::from(response.status),
            headers: response.headers.clone(),
            body: response.body.clone(),
            data: context.response_json().cloned(),
        }
    }

    /// Error for a call that never received a response
    pub fn without_response(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            status_code: -1,
            headers: Headers::new(),
            body: Vec::new(),
            data: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Drop the structured payload, keeping the raw body
    pub fn without_data(mut self) -> Self {
        self.data = None;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Response status, `-1` when no response was received
    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Field of the parsed body addressed by a JSON pointer (`/a/b`)
    pub fn field(&self, pointer: &str) -> Option<&Value> {
        self.data.as_ref()?.pointer(pointer)
    }

    /// Deserialize the parsed body into a case-specific shape
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self.data.clone().ok_or_else(|| Error::Deserialization {
            message: format!("{} carries no JSON body", self.kind),
            source: None,
        })?;
        serde_json::from_value(data).map_err(|e| Error::Deserialization {
            message: format!("Unable to read {} body: {}", self.kind, e),
            source: Some(e.into()),
        })
    }
}
