//! Apiwire Core - Runtime core for generated API client SDKs
//!
//! This crate provides the machinery every generated endpoint method relies
//! on: turning declared parameters into an HTTP request, applying auth,
//! sending with retries, and routing the response to a typed value or a
//! typed error.
//!
//! # Main Components
//!
//! - **Configuration**: servers, global headers, user agent, auth registry,
//!   retry policy and transport, shared by every call
//! - **Request Building**: parameter validation and serialization, URL
//!   templates, bodies and forms, auth composition
//! - **Execution**: pluggable transport, interceptors, retry with backoff
//!   and Retry-After, cancellation
//! - **Response Routing**: error cases by status, message templates,
//!   deserialization and one-of/any-of unions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use apiwire_core::{ApiCall, GlobalConfiguration, Method, Parameter, RequestBuilder, ResponseHandler, Result};
//!
//! async fn example() -> Result<()> {
//!     let config = Arc::new(
//!         GlobalConfiguration::builder()
//!             .base_url("https://api.example.com")
//!             .build()?,
//!     );
//!
//!     let user: Option<serde_json::Value> = ApiCall::new(config)
//!         .request(
//!             RequestBuilder::setup(Method::GET, "/users/{id}")
//!                 .parameter(Parameter::template("id", 42)),
//!         )
//!         .response(ResponseHandler::json())
//!         .execute()
//!         .await?;
//!     println!("{:?}", user);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod call;
pub mod config;
pub mod convert;
pub mod error;
pub mod http;
pub mod logging;
pub mod params;
pub mod request;
pub mod response;
pub mod union;

#[cfg(test)]
mod proptest_strategies;

// Re-export main types for convenience
pub use error::{Error, Result};

pub use auth::{
    AuthError, AuthGroup, AuthManager, AuthRegistry, BasicAuthManager, BearerAuthManager,
    HeaderAuthManager, QueryAuthManager,
};
pub use call::ApiCall;
pub use config::{GlobalConfiguration, GlobalConfigurationBuilder, HttpClientConfiguration};
pub use http::{
    HttpInterceptor, HttpRequest, HttpResponse, Method, RequestBody, RetryConfig, RetryOption,
    Transport, TransportError, TransportErrorKind,
};
pub use logging::{init_logging, HttpLoggingOptions, LogFormat, LoggingConfig, SdkLogger};
pub use params::{ArraySerialization, Parameter, ParameterLocation};
pub use request::RequestBuilder;
pub use response::{ApiError, ApiResponse, ErrorCase, ResponseHandler};
pub use union::{Candidate, UnionError, UnionKind, UnionType};

/// Re-exported so callers can cancel calls without depending on tokio-util
pub use tokio_util::sync::CancellationToken;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
