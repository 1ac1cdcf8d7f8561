//! Success results with response metadata

use crate::http::headers::Headers;

/// Status, headers and the deserialized body of a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub headers: Headers,
    /// `None` for empty bodies, void calls and 404s under `null_on_404`
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(status_code: u16, headers: Headers, data: Option<T>) -> Self {
        Self {
            status_code,
            headers,
            data,
        }
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Convert the payload, keeping status and headers
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            status_code: self.status_code,
            headers: self.headers,
            data: self.data.map(f),
        }
    }
}
