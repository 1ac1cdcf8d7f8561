//! Status routing of responses to typed values or errors

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::response::api_response::ApiResponse;
use crate::response::error::{ApiError, ExceptionContext};
use crate::response::template;
use crate::{Error, Result};

/// Message of the error raised when no rule matches a non-2xx response
pub const NOT_OK_MESSAGE: &str = "HTTP Response Not OK";

/// Rule key matching every status not matched more precisely
pub const DEFAULT_RULE: &str = "0";

/// Builds the error for a matched case from the rendered message
pub type ErrorFactory = Arc<dyn Fn(String, &ExceptionContext<'_>) -> ApiError + Send + Sync>;

type BodyDeserializer<T> = Arc<dyn Fn(&str) -> Result<T> + Send + Sync>;

/// A declared error case of a call
#[derive(Clone)]
pub struct ErrorCase {
    message: String,
    is_template: bool,
    treat_as_error: bool,
    factory: ErrorFactory,
}

impl ErrorCase {
    /// Case with a fixed message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_template: false,
            treat_as_error: true,
            factory: Arc::new(default_factory),
        }
    }

    /// Case whose message is rendered from `{$...}` placeholders
    pub fn template(template: impl Into<String>) -> Self {
        Self {
            is_template: true,
            ..Self::new(template)
        }
    }

    /// Tag errors from the default factory with `kind`
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.factory = Arc::new(move |message: String, context: &ExceptionContext<'_>| {
            ApiError::from_context(message, context).with_kind(kind.clone())
        });
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(String, &ExceptionContext<'_>) -> ApiError + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    /// When cleared, a match is documented only and the response is handled
    /// as a success
    pub fn treat_as_error(mut self, treat_as_error: bool) -> Self {
        self.treat_as_error = treat_as_error;
        self
    }

    pub fn is_error(&self) -> bool {
        self.treat_as_error
    }

    /// Render the message and build the error
    pub fn build(&self, context: &ExceptionContext<'_>) -> ApiError {
        let message = if self.is_template {
            template::render(&self.message, context)
        } else {
            self.message.clone()
        };
        (self.factory)(message, context)
    }
}

fn default_factory(message: String, context: &ExceptionContext<'_>) -> ApiError {
    ApiError::from_context(message, context)
}

impl fmt::Debug for ErrorCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorCase")
            .field("message", &self.message)
            .field("is_template", &self.is_template)
            .field("treat_as_error", &self.treat_as_error)
            .finish()
    }
}

/// What the router decided for one response
#[derive(Debug, Clone, Copy)]
pub enum RouteOutcome<'a> {
    /// Deserialize as a success
    Success,
    /// 404 converted to an absent value
    Absent,
    /// Raise the case registered under this key
    Case(&'a str, &'a ErrorCase),
    /// No rule matched a non-2xx status
    NotOk,
}

/// Find the rule for `status`: exact code, then `NXX` band, then `"0"`.
///
/// Local cases shadow global ones with the same key. Successful statuses
/// are only checked against exact and band rules.
pub fn route<'a>(
    status: u16,
    local: &'a [(String, ErrorCase)],
    global: &'a [(String, ErrorCase)],
) -> Option<(&'a str, &'a ErrorCase)> {
    let exact = status.to_string();
    let band = format!("{}XX", status / 100);
    let success = (200..300).contains(&status);

    let mut keys = vec![exact.as_str(), band.as_str()];
    if !success {
        keys.push(DEFAULT_RULE);
    }

    keys.iter().find_map(|key| {
        local
            .iter()
            .chain(global.iter())
            .find(|(rule, _)| rule.eq_ignore_ascii_case(key))
            .map(|(rule, case)| (rule.as_str(), case))
    })
}

/// Turns a response into a typed value or an error
pub struct ResponseHandler<T> {
    deserializer: Option<BodyDeserializer<T>>,
    error_cases: Vec<(String, ErrorCase)>,
    null_on_404: bool,
}

impl<T> Clone for ResponseHandler<T> {
    fn clone(&self) -> Self {
        Self {
            deserializer: self.deserializer.clone(),
            error_cases: self.error_cases.clone(),
            null_on_404: self.null_on_404,
        }
    }
}

impl<T> fmt::Debug for ResponseHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("deserializer", &self.deserializer.is_some())
            .field("error_cases", &self.error_cases)
            .field("null_on_404", &self.null_on_404)
            .finish()
    }
}

impl<T: DeserializeOwned> ResponseHandler<T> {
    /// Deserialize success bodies as JSON
    pub fn json() -> Self {
        Self::with_deserializer(|text| {
            serde_json::from_str(text).map_err(|e| Error::Deserialization {
                message: format!("Unable to deserialize response body: {}", e),
                source: Some(e.into()),
            })
        })
    }
}

impl ResponseHandler<String> {
    /// Return success bodies as text
    pub fn text() -> Self {
        Self::with_deserializer(|text| Ok(text.to_string()))
    }
}

impl ResponseHandler<()> {
    /// Ignore success bodies
    pub fn void() -> Self {
        Self {
            deserializer: None,
            error_cases: Vec::new(),
            null_on_404: false,
        }
    }
}

impl<T> ResponseHandler<T> {
    pub fn with_deserializer<F>(deserializer: F) -> Self
    where
        F: Fn(&str) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            deserializer: Some(Arc::new(deserializer)),
            error_cases: Vec::new(),
            null_on_404: false,
        }
    }

    /// Register an error case under an exact status, an `NXX` band or `"0"`.
    ///
    /// A later case with the same key replaces the earlier one.
    pub fn error_case(mut self, key: impl Into<String>, case: ErrorCase) -> Self {
        let key = key.into();
        self.error_cases.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&key));
        self.error_cases.push((key, case));
        self
    }

    /// Treat a 404 as an absent value instead of an error
    pub fn null_on_404(mut self) -> Self {
        self.null_on_404 = true;
        self
    }

    pub fn error_cases(&self) -> &[(String, ErrorCase)] {
        &self.error_cases
    }

    /// Whether the call expects a body to deserialize
    pub fn expects_body(&self) -> bool {
        self.deserializer.is_some()
    }

    /// Run the success deserializer on `text`, even when it is empty
    pub fn deserialize_body(&self, text: &str) -> Result<Option<T>> {
        match &self.deserializer {
            Some(deserializer) => deserializer(text).map(Some),
            None => Ok(None),
        }
    }

    /// Decide what to do with `response` without building anything
    pub fn outcome<'a>(
        &'a self,
        response: &HttpResponse,
        global_cases: &'a [(String, ErrorCase)],
    ) -> RouteOutcome<'a> {
        if self.null_on_404 && response.status == 404 {
            return RouteOutcome::Absent;
        }
        match route(response.status, &self.error_cases, global_cases) {
            Some((key, case)) if case.is_error() => RouteOutcome::Case(key, case),
            Some(_) => RouteOutcome::Success,
            None if response.is_success() => RouteOutcome::Success,
            None => RouteOutcome::NotOk,
        }
    }

    /// Route `response` to a typed value or an error
    pub fn handle(
        &self,
        request: &HttpRequest,
        response: &HttpResponse,
        global_cases: &[(String, ErrorCase)],
    ) -> Result<ApiResponse<T>> {
        let outcome = self.outcome(response, global_cases);
        tracing::debug!(status = response.status, "routing response");

        let data = match outcome {
            RouteOutcome::Absent => None,
            RouteOutcome::Success if response.has_empty_body() => None,
            RouteOutcome::Success => self.deserialize_body(&response.text())?,
            RouteOutcome::Case(key, case) => {
                tracing::debug!(rule = key, "response matched error case");
                let context = ExceptionContext::new(request, response);
                return Err(case.build(&context).into());
            }
            RouteOutcome::NotOk => {
                let context = ExceptionContext::new(request, response);
                return Err(ApiError::from_context(NOT_OK_MESSAGE, &context)
                    .without_data()
                    .into());
            }
        };

        Ok(ApiResponse::new(response.status, response.headers.clone(), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobalConfiguration;
    use crate::http::headers::Headers;
    use crate::request::RequestBuilder;
    use reqwest::Method;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: u32,
    }

    fn request() -> HttpRequest {
        let config = GlobalConfiguration::builder()
            .base_url("https://api.example.com")
            .build()
            .unwrap();
        RequestBuilder::setup(Method::GET, "/orders/1")
            .build(&config)
            .unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, Headers::new(), body.as_bytes().to_vec())
    }

    fn handler() -> ResponseHandler<Order> {
        ResponseHandler::json()
            .error_case("404", ErrorCase::new("Order not found").kind("NotFound"))
            .error_case("5XX", ErrorCase::template("Server failed with {$statusCode}"))
            .error_case(DEFAULT_RULE, ErrorCase::new("Unexpected error"))
    }

    fn api_error(result: Result<ApiResponse<Order>>) -> ApiError {
        match result {
            Err(Error::Api(error)) => *error,
            other => panic!("expected api error, got {:?}", other.map(|r| r.status_code)),
        }
    }

    #[test]
    fn test_success_deserializes() {
        let result = handler().handle(&request(), &response(200, r#"{"id":7}"#), &[]);
        assert_eq!(result.unwrap().data, Some(Order { id: 7 }));
    }

    #[test]
    fn test_empty_success_body_is_absent() {
        let result = handler().handle(&request(), &response(204, ""), &[]).unwrap();
        assert_eq!(result.data, None);
        assert_eq!(result.status_code, 204);
    }

    #[test]
    fn test_exact_then_band_then_default() {
        let error = api_error(handler().handle(&request(), &response(404, ""), &[]));
        assert_eq!(error.kind(), "NotFound");

        let error = api_error(handler().handle(&request(), &response(503, ""), &[]));
        assert_eq!(error.message(), "Server failed with 503");

        let error = api_error(handler().handle(&request(), &response(409, ""), &[]));
        assert_eq!(error.message(), "Unexpected error");
    }

    #[test]
    fn test_no_rule_gives_generic_error_without_data() {
        let error = api_error(
            ResponseHandler::<Order>::json().handle(&request(), &response(418, r#"{"a":1}"#), &[]),
        );
        assert_eq!(error.message(), NOT_OK_MESSAGE);
        assert_eq!(error.data(), None);
        assert_eq!(error.body(), br#"{"a":1}"#);
    }

    #[test]
    fn test_null_on_404() {
        let result = handler()
            .null_on_404()
            .handle(&request(), &response(404, "missing"), &[])
            .unwrap();
        assert_eq!(result.data, None);
    }

    #[test]
    fn test_default_rule_ignored_for_success() {
        let result = handler().handle(&request(), &response(200, r#"{"id":1}"#), &[]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_success_band_case_raises() {
        let handler = ResponseHandler::<Order>::json()
            .error_case("2XX", ErrorCase::new("Soft failure"));
        let error = api_error(handler.handle(&request(), &response(202, "{}"), &[]));
        assert_eq!(error.message(), "Soft failure");
    }

    #[test]
    fn test_case_not_treated_as_error_falls_through() {
        let handler = ResponseHandler::<Order>::json()
            .error_case("409", ErrorCase::new("Conflict").treat_as_error(false));
        let result = handler.handle(&request(), &response(409, r#"{"id":3}"#), &[]);
        assert_eq!(result.unwrap().data, Some(Order { id: 3 }));
    }

    #[test]
    fn test_local_cases_shadow_global() {
        let global = vec![
            ("404".to_string(), ErrorCase::new("global 404")),
            ("401".to_string(), ErrorCase::new("global 401")),
        ];
        let error = api_error(handler().handle(&request(), &response(404, ""), &global));
        assert_eq!(error.message(), "Order not found");
        let error = api_error(handler().handle(&request(), &response(401, ""), &global));
        assert_eq!(error.message(), "global 401");
    }

    #[test]
    fn test_explicit_empty_deserialize_fails_for_scalars() {
        let handler = ResponseHandler::<f64>::json();
        assert!(handler.deserialize_body("").is_err());
        let result = handler.handle(&request(), &response(200, ""), &[]).unwrap();
        assert_eq!(result.data, None);
    }

    #[test]
    fn test_bad_body_is_deserialization_error() {
        let result = handler().handle(&request(), &response(200, "not json"), &[]);
        assert!(matches!(result, Err(Error::Deserialization { .. })));
    }
}
