//! Hooks invoked around every send attempt

use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;

/// Pre/post callbacks around `Transport::send`.
///
/// Interceptors run synchronously in registration order, once per attempt.
/// Both methods default to doing nothing.
pub trait HttpInterceptor: Send + Sync {
    fn before_request(&self, _request: &HttpRequest) {}

    fn after_response(&self, _request: &HttpRequest, _response: &HttpResponse) {}
}
