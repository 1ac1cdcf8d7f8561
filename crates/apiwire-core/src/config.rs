//! Client configuration
//!
//! This module holds the two configuration values every call reads:
//! - `HttpClientConfiguration`: timeout, TLS and retry settings, loadable
//!   from JSON and overridable from `APIWIRE_*` environment variables
//! - `GlobalConfiguration`: servers, global headers and template values,
//!   user agent, auth registry, global error cases, logger, interceptors
//!   and transport
//!
//! `GlobalConfiguration` is assembled once with its builder and then only
//! read, usually behind an `Arc` shared by every call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{AuthManager, AuthRegistry};
use crate::http::headers::Headers;
use crate::http::interceptor::HttpInterceptor;
use crate::http::retry::RetryConfig;
use crate::http::transport::{ReqwestTransport, Transport};
use crate::logging::SdkLogger;
use crate::response::ErrorCase;
use crate::{Error, Result};

/// Name used for the server when only one base URL is configured
pub const DEFAULT_SERVER: &str = "default";

/// Transport-level settings shared by every call of a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfiguration {
    /// Per-attempt timeout in seconds (0 disables the timeout)
    pub timeout_secs: f64,
    /// Accept invalid TLS certificates
    pub skip_ssl_cert_verification: bool,
    /// Retry policy
    pub retry: RetryConfig,
}

impl Default for HttpClientConfiguration {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            skip_ssl_cert_verification: false,
            retry: RetryConfig::default(),
        }
    }
}

impl HttpClientConfiguration {
    /// Load from JSON text; omitted fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration {
            message: format!("Invalid HTTP client configuration: {}", e),
            source: Some(e.into()),
        })
    }

    /// Per-attempt timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs > 0.0 {
            Duration::try_from_secs_f64(self.timeout_secs).ok()
        } else {
            None
        }
    }

    /// Apply `APIWIRE_*` environment overrides
    pub fn merge_with_env(&mut self) {
        self.merge_with_vars(|name| std::env::var(name).ok());
    }

    /// Apply `APIWIRE_*` overrides read through `lookup`; values that do
    /// not parse are logged and ignored
    pub fn merge_with_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(timeout) = override_value(&lookup, "APIWIRE_TIMEOUT") {
            self.timeout_secs = timeout;
        }
        if let Some(retries) = override_value::<u32>(&lookup, "APIWIRE_NUMBER_OF_RETRIES") {
            self.retry.number_of_retries = retries;
        }
        if let Some(factor) = override_value(&lookup, "APIWIRE_BACKOFF_FACTOR") {
            self.retry.backoff_factor = factor;
        }
        if let Some(interval) = override_value(&lookup, "APIWIRE_RETRY_INTERVAL") {
            self.retry.retry_interval_secs = interval;
        }
        if let Some(maximum) = override_value(&lookup, "APIWIRE_MAXIMUM_RETRY_WAIT_TIME") {
            self.retry.maximum_retry_wait_time_secs = maximum;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if Duration::try_from_secs_f64(self.timeout_secs).is_err() {
            return Err(Error::configuration(format!(
                "Timeout must be a non-negative number of seconds within range, got {}",
                self.timeout_secs
            )));
        }
        self.retry.validate().map_err(Error::configuration)
    }
}

fn override_value<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Option<T> {
    let raw = lookup(var)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = var, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

/// Immutable configuration shared by every call
pub struct GlobalConfiguration {
    servers: HashMap<String, String>,
    default_server: String,
    global_headers: Headers,
    global_template_parameters: Vec<(String, Value)>,
    user_agent: Option<String>,
    auth_managers: AuthRegistry,
    error_cases: Vec<(String, ErrorCase)>,
    http_client: HttpClientConfiguration,
    logger: SdkLogger,
    interceptors: Vec<Arc<dyn HttpInterceptor>>,
    transport: Arc<dyn Transport>,
}

impl GlobalConfiguration {
    pub fn builder() -> GlobalConfigurationBuilder {
        GlobalConfigurationBuilder::default()
    }

    /// Base URL of `server`, or of the default server when `None`.
    ///
    /// With no servers configured the base is empty and paths are used as
    /// given.
    pub fn base_url(&self, server: Option<&str>) -> Result<&str> {
        if self.servers.is_empty() && server.is_none() {
            return Ok("");
        }
        let name = server.unwrap_or(&self.default_server);
        self.servers
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::configuration(format!("Unknown server `{}`", name)))
    }

    pub fn global_headers(&self) -> &Headers {
        &self.global_headers
    }

    pub fn global_template_parameters(&self) -> &[(String, Value)] {
        &self.global_template_parameters
    }

    /// User agent with `{engine}`, `{engine-version}` and `{os-info}` filled in
    pub fn user_agent(&self) -> Option<String> {
        self.user_agent.as_ref().map(|template| {
            template
                .replace("{engine}", "Rust")
                .replace(
                    "{engine-version}",
                    option_env!("CARGO_PKG_RUST_VERSION")
                        .filter(|v| !v.is_empty())
                        .unwrap_or("stable"),
                )
                .replace(
                    "{os-info}",
                    &format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
                )
        })
    }

    pub fn auth_managers(&self) -> &AuthRegistry {
        &self.auth_managers
    }

    /// Error cases applied to every call, in registration order
    pub fn error_cases(&self) -> &[(String, ErrorCase)] {
        &self.error_cases
    }

    pub fn http_client(&self) -> &HttpClientConfiguration {
        &self.http_client
    }

    pub fn logger(&self) -> &SdkLogger {
        &self.logger
    }

    pub fn interceptors(&self) -> &[Arc<dyn HttpInterceptor>] {
        &self.interceptors
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl fmt::Debug for GlobalConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut auth: Vec<&String> = self.auth_managers.keys().collect();
        auth.sort();
        f.debug_struct("GlobalConfiguration")
            .field("servers", &self.servers)
            .field("default_server", &self.default_server)
            .field("global_headers", &self.global_headers)
            .field("user_agent", &self.user_agent)
            .field("auth_managers", &auth)
            .field("error_cases", &self.error_cases.len())
            .field("http_client", &self.http_client)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// Builder for [`GlobalConfiguration`]
#[derive(Default)]
pub struct GlobalConfigurationBuilder {
    servers: HashMap<String, String>,
    default_server: Option<String>,
    global_headers: Headers,
    global_template_parameters: Vec<(String, Value)>,
    user_agent: Option<String>,
    auth_managers: AuthRegistry,
    error_cases: Vec<(String, ErrorCase)>,
    http_client: Option<HttpClientConfiguration>,
    logger: Option<SdkLogger>,
    interceptors: Vec<Arc<dyn HttpInterceptor>>,
    transport: Option<Arc<dyn Transport>>,
}

impl GlobalConfigurationBuilder {
    /// Register a named server; the URL may contain `{placeholders}`
    pub fn server(mut self, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.servers.insert(name.into(), base_url.into());
        self
    }

    /// Shorthand for a single server registered as the default
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        self.server(DEFAULT_SERVER, base_url)
    }

    pub fn default_server(mut self, name: impl Into<String>) -> Self {
        self.default_server = Some(name.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.global_headers.insert(name, value);
        self
    }

    pub fn template_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .global_template_parameters
            .iter_mut()
            .find(|(key, _)| *key == name)
        {
            Some(slot) => slot.1 = value,
            None => self.global_template_parameters.push((name, value)),
        }
        self
    }

    pub fn user_agent(mut self, template: impl Into<String>) -> Self {
        self.user_agent = Some(template.into());
        self
    }

    pub fn auth(mut self, name: impl Into<String>, manager: impl AuthManager + 'static) -> Self {
        self.auth_managers.insert(name.into(), Arc::new(manager));
        self
    }

    /// Error case applied to every call unless the call declares the same
    /// key; a later case with the same key replaces the earlier one
    pub fn error_case(mut self, key: impl Into<String>, case: ErrorCase) -> Self {
        let key = key.into();
        self.error_cases.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&key));
        self.error_cases.push((key, case));
        self
    }

    pub fn http_client(mut self, config: HttpClientConfiguration) -> Self {
        self.http_client = Some(config);
        self
    }

    pub fn logger(mut self, logger: SdkLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn interceptor(mut self, interceptor: impl HttpInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<GlobalConfiguration> {
        let http_client = self.http_client.unwrap_or_default();
        http_client.validate()?;

        let default_server = match self.default_server {
            Some(name) => name,
            None if self.servers.len() == 1 => self
                .servers
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            None => DEFAULT_SERVER.to_string(),
        };
        if !self.servers.is_empty() && !self.servers.contains_key(&default_server) {
            return Err(Error::configuration(format!(
                "Default server `{}` is not among the configured servers",
                default_server
            )));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&http_client)?),
        };

        tracing::debug!(
            servers = self.servers.len(),
            auth_managers = self.auth_managers.len(),
            interceptors = self.interceptors.len(),
            "global configuration built"
        );

        Ok(GlobalConfiguration {
            servers: self.servers,
            default_server,
            global_headers: self.global_headers,
            global_template_parameters: self.global_template_parameters,
            user_agent: self.user_agent,
            auth_managers: self.auth_managers,
            error_cases: self.error_cases,
            http_client,
            logger: self.logger.unwrap_or_default(),
            interceptors: self.interceptors,
            transport,
        })
    }
}
