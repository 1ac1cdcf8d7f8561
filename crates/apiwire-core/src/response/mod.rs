//! Response routing and error construction
//!
//! A `ResponseHandler` routes each response by status: exact code, then
//! `NXX` band, then the `"0"` default. Matched error cases render their
//! message through the `{$...}` template resolver and build an `ApiError`.

pub mod api_response;
pub mod error;
pub mod handler;
pub mod template;

pub use api_response::ApiResponse;
pub use error::{ApiError, ExceptionContext, DEFAULT_ERROR_KIND};
pub use handler::{
    route, ErrorCase, ErrorFactory, ResponseHandler, RouteOutcome, DEFAULT_RULE, NOT_OK_MESSAGE,
};
pub use template::render;
