//! Per-call request construction

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use crate::auth::AuthGroup;
use crate::config::GlobalConfiguration;
use crate::http::body::APPLICATION_JSON;
use crate::http::headers::Headers;
use crate::http::request::{HttpRequest, TemplateValue};
use crate::http::retry::RetryOption;
use crate::params::{ArraySerialization, Parameter, ParameterSet};
use crate::request::parts::RequestParts;
use crate::{Error, Result};

/// Declarative description of one call, turned into an [`HttpRequest`] by
/// [`RequestBuilder::build`]
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    path: String,
    server: Option<String>,
    parameters: ParameterSet,
    auth: Option<AuthGroup>,
    retry_option: RetryOption,
    array_serialization: ArraySerialization,
    content_type_defaults: bool,
    accept: Option<String>,
}

impl RequestBuilder {
    /// Start a call with `method` and a path template relative to the server
    pub fn setup(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            server: None,
            parameters: ParameterSet::new(),
            auth: None,
            retry_option: RetryOption::default(),
            array_serialization: ArraySerialization::default(),
            content_type_defaults: true,
            accept: None,
        }
    }

    /// Use a named server instead of the default one
    pub fn server(mut self, name: impl Into<String>) -> Self {
        self.server = Some(name.into());
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.add(parameter);
        self
    }

    pub fn parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        for parameter in parameters {
            self.parameters.add(parameter);
        }
        self
    }

    pub fn with_auth(mut self, auth: AuthGroup) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn retry_option(mut self, option: RetryOption) -> Self {
        self.retry_option = option;
        self
    }

    pub fn array_serialization(mut self, mode: ArraySerialization) -> Self {
        self.array_serialization = mode;
        self
    }

    /// Skip the default `Accept` and body `Content-Type` headers
    pub fn disable_content_type(mut self) -> Self {
        self.content_type_defaults = false;
        self
    }

    /// Explicit `Accept` header
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Build the immutable request.
    ///
    /// Global headers, user agent and global template values go in first,
    /// then the call parameters, then auth. Validation, serialization and
    /// auth failures are returned before anything is sent, as are header
    /// names or values that cannot go on the wire and URLs without a host.
    pub fn build(&self, config: &GlobalConfiguration) -> Result<HttpRequest> {
        self.parameters.validate()?;

        let base = config.base_url(self.server.as_deref())?;
        let url_template = join_url(base, &self.path);

        let mut parts = RequestParts::new();
        parts.default_content_type = self.content_type_defaults;
        parts.headers = config.global_headers().clone();
        if let Some(user_agent) = config.user_agent() {
            parts.headers.insert("User-Agent", user_agent);
        }
        for (name, value) in config.global_template_parameters() {
            parts.set_template(
                name.as_str(),
                TemplateValue {
                    value: value.clone(),
                    encode: true,
                },
            );
        }

        self.parameters.apply(&mut parts, self.array_serialization)?;

        if let Some(auth) = &self.auth {
            auth.apply(config.auth_managers(), &mut parts)?;
        }

        match &self.accept {
            Some(accept) => parts.headers.insert("Accept", accept.as_str()),
            None if self.content_type_defaults => {
                parts.headers.insert_if_absent("Accept", APPLICATION_JSON);
            }
            None => {}
        }

        let request = HttpRequest::new(
            self.method.clone(),
            url_template,
            parts.template_values,
            parts.query,
            self.array_serialization,
            parts.headers,
            parts.body,
            self.retry_option,
        );

        validate_headers(request.headers())?;
        ensure_absolute(request.url())?;

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            headers = request.headers().len(),
            "request built"
        );

        Ok(request)
    }
}

fn validate_headers(headers: &Headers) -> Result<()> {
    for (name, value) in headers.iter() {
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::Configuration {
            message: format!("Invalid header name `{}`", name),
            source: Some(e.into()),
        })?;
        HeaderValue::from_str(value).map_err(|e| Error::Configuration {
            message: format!("Invalid value for header `{}`", name),
            source: Some(e.into()),
        })?;
    }
    Ok(())
}

fn ensure_absolute(url: &str) -> Result<()> {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => Ok(()),
        Ok(_) => Err(Error::configuration(format!(
            "Request URL `{}` has no host",
            url
        ))),
        Err(e) => Err(Error::Configuration {
            message: format!(
                "Request URL `{}` is not absolute; configure a server or use a full URL",
                url
            ),
            source: Some(e.into()),
        }),
    }
}

fn join_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerAuthManager;
    use crate::http::body::RequestBody;
    use serde_json::json;

    fn config() -> GlobalConfiguration {
        GlobalConfiguration::builder()
            .server("production", "https://{region}.example.com/v1")
            .server("sandbox", "https://sandbox.example.com")
            .default_server("production")
            .template_parameter("region", "eu")
            .header("X-Client", "sdk")
            .header("X-Env", "global")
            .auth("bearer", BearerAuthManager::new(Some("tok".to_string())))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_resolves_server_and_template() {
        let request = RequestBuilder::setup(Method::GET, "/users/{id}")
            .parameter(Parameter::template("id", 42))
            .parameter(Parameter::query("expand", json!(["a", "b"])))
            .array_serialization(ArraySerialization::Csv)
            .build(&config())
            .unwrap();
        assert_eq!(request.url(), "https://eu.example.com/v1/users/42?expand=a%2Cb");
        assert_eq!(request.headers().get("Accept"), Some(APPLICATION_JSON));
    }

    #[test]
    fn test_named_server() {
        let request = RequestBuilder::setup(Method::GET, "/ping")
            .server("sandbox")
            .build(&config())
            .unwrap();
        assert_eq!(request.url(), "https://sandbox.example.com/ping");

        let err = RequestBuilder::setup(Method::GET, "/ping")
            .server("staging")
            .build(&config())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_call_headers_override_globals() {
        let request = RequestBuilder::setup(Method::GET, "/")
            .parameter(Parameter::header("x-env", "call"))
            .build(&config())
            .unwrap();
        assert_eq!(request.headers().get("X-Env"), Some("call"));
        assert_eq!(request.headers().get("X-Client"), Some("sdk"));
    }

    #[test]
    fn test_auth_applied() {
        let request = RequestBuilder::setup(Method::GET, "/")
            .with_auth(AuthGroup::single("bearer"))
            .build(&config())
            .unwrap();
        assert_eq!(request.headers().get("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_validation_fails_before_auth() {
        let err = RequestBuilder::setup(Method::GET, "/")
            .parameter(Parameter::query("q", None::<String>).required())
            .with_auth(AuthGroup::single("missing"))
            .build(&config())
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required query field: `q`");
    }

    #[test]
    fn test_missing_auth_is_auth_error() {
        let err = RequestBuilder::setup(Method::GET, "/")
            .with_auth(AuthGroup::single("missing"))
            .build(&config())
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_disable_content_type() {
        let request = RequestBuilder::setup(Method::POST, "/upload")
            .parameter(Parameter::body_value(json!({"a": 1})))
            .disable_content_type()
            .build(&config())
            .unwrap();
        assert!(request.headers().get("Accept").is_none());
        assert!(request.headers().get("Content-Type").is_none());
        assert_eq!(request.body(), &RequestBody::Json("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_explicit_accept() {
        let request = RequestBuilder::setup(Method::GET, "/report")
            .accept("text/csv")
            .build(&config())
            .unwrap();
        assert_eq!(request.headers().get("accept"), Some("text/csv"));
    }

    #[test]
    fn test_invalid_header_value_is_configuration_error() {
        let err = RequestBuilder::setup(Method::GET, "/status")
            .parameter(Parameter::header("X-Bad", "a\nb"))
            .build(&config())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid value for header `X-Bad`"
        );
    }

    #[test]
    fn test_invalid_header_name_is_configuration_error() {
        let err = RequestBuilder::setup(Method::GET, "/status")
            .parameter(Parameter::header("X Bad", "ok"))
            .build(&config())
            .unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Invalid header name `X Bad`");
    }

    #[test]
    fn test_relative_url_without_server_is_rejected() {
        let bare = GlobalConfiguration::builder().build().unwrap();
        let err = RequestBuilder::setup(Method::GET, "/status")
            .build(&bare)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let request = RequestBuilder::setup(Method::GET, "https://other.example.com/status")
            .build(&bare)
            .unwrap();
        assert_eq!(request.url(), "https://other.example.com/status");
    }
}
