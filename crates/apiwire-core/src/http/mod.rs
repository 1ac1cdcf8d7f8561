//! Wire model and execution primitives
//!
//! This module provides:
//! - the immutable request and response descriptors
//! - ordered, case-insensitive headers and body representations
//! - the pluggable transport capability and its reqwest implementation
//! - pre/post send interceptors
//! - retry logic with exponential backoff, jitter and Retry-After support

pub mod body;
pub mod error;
pub mod headers;
pub mod interceptor;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;

pub use body::{FileStream, MultipartPart, PartContent, RequestBody};
pub use error::{TransportError, TransportErrorKind};
pub use headers::Headers;
pub use interceptor::HttpInterceptor;
pub use request::{HttpRequest, TemplateValue};
pub use response::HttpResponse;
pub use retry::{execute_with_retry, RetryConfig, RetryDecision, RetryHandler, RetryOption};
pub use transport::{ReqwestTransport, Transport};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
