//! Logging utilities
//!
//! This module provides:
//! - Structured `tracing` subscriber setup for applications embedding the SDK
//! - Call ID generation for correlating the events of one call
//! - Sensitive data redaction
//! - `SdkLogger`, the request/response logger driven by the call pipeline

use std::collections::HashMap;
use std::io::IsTerminal;

use serde::{Deserialize, Serialize};
use tracing::{Level, Span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::http::headers::Headers;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::{Error, Result};

/// Replacement text for masked header values
pub const REDACTED: &str = "**Redacted**";

/// Headers masked unless explicitly unmasked
pub const SENSITIVE_HEADERS: [&str; 4] = [
    "authorization",
    "set-cookie",
    "proxy-authorization",
    "www-authenticate",
];

/// Subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format: compact, full, json
    pub format: LogFormat,
    /// Colored output when stderr is a terminal
    pub ansi: bool,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Include file and line numbers
    pub source_location: bool,
    /// Module-based filtering
    pub module_filter: Option<HashMap<String, String>>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            ansi: true,
            thread_ids: false,
            source_location: false,
            module_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Apply `RUST_LOG` and `APIWIRE_LOG_FORMAT` overrides
    pub fn merge_with_env(&mut self) {
        self.merge_with_vars(|name| std::env::var(name).ok());
    }

    /// Apply the same overrides read through `lookup`
    pub fn merge_with_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // RUST_LOG takes precedence
        if let Some(rust_log) = lookup("RUST_LOG") {
            self.level = rust_log;
        }

        if let Some(format) = lookup("APIWIRE_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "compact" => self.format = LogFormat::Compact,
                "full" => self.format = LogFormat::Full,
                "json" => self.format = LogFormat::Json,
                _ => tracing::warn!("Invalid log format: {}, using default", format),
            }
        }
    }
}

/// Install a global `tracing` subscriber
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let env_filter = create_env_filter(&config)?;
    let ansi = config.ansi && std::io::stderr().is_terminal();

    let installed = match config.format {
        LogFormat::Compact => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_ansi(ansi)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_writer(std::io::stderr)
                .compact()
                .finish(),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_ansi(false)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_writer(std::io::stderr)
                .json()
                .finish(),
        ),
        LogFormat::Full => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_ansi(ansi)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_writer(std::io::stderr)
                .finish(),
        ),
    };

    installed.map_err(|e| Error::Configuration {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e.into()),
    })?;

    tracing::info!(config = ?config, "Logging system initialized");
    Ok(())
}

fn create_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level).map_err(|e| Error::Configuration {
        message: format!("Invalid log level `{}`: {}", config.level, e),
        source: Some(e.into()),
    })?;

    if let Some(module_filters) = &config.module_filter {
        for (module, level) in module_filters {
            let directive = format!("{}={}", module, level)
                .parse()
                .map_err(|e| Error::configuration(format!("Invalid filter directive: {}", e)))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

/// Unique ID for one call
pub fn generate_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Span wrapping every event of one call
pub fn create_call_span(call_id: &str, method: &str, url: &str) -> Span {
    tracing::info_span!("api_call", call_id = call_id, method = method, url = url)
}

/// Sensitive data redaction utilities
pub mod redaction {
    use regex::Regex;
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    fn patterns() -> &'static [Regex] {
        PATTERNS.get_or_init(|| {
            [
                r#"(?i)(api[_-]?key|apikey)[=:\s]+['"]?([a-zA-Z0-9_-]{10,})['"]?"#,
                r#"(?i)(token|bearer)[=:\s]+['"]?([a-zA-Z0-9_.-]{10,})['"]?"#,
                r#"(?i)(password|passwd|pwd)[=:\s]+['"]?([^\s'"]{3,})['"]?"#,
            ]
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
        })
    }

    /// Mask credential-looking substrings
    pub fn redact_sensitive(input: &str) -> String {
        let mut result = input.to_string();
        for regex in patterns() {
            result = regex.replace_all(&result, "$1=***").to_string();
        }
        result
    }

    /// Mask sensitive keys and credential-looking strings inside a JSON tree
    pub fn redact_json_value(value: &mut serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    if is_sensitive_key(key) {
                        *val = serde_json::Value::String("***".to_string());
                    } else {
                        redact_json_value(val);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    redact_json_value(item);
                }
            }
            serde_json::Value::String(s) => {
                *s = redact_sensitive(s);
            }
            _ => {}
        }
    }

    /// Redact a body given as text, treating it as JSON when it parses
    pub fn redact_body(body: &str) -> String {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(mut value) => {
                redact_json_value(&mut value);
                value.to_string()
            }
            Err(_) => redact_sensitive(body),
        }
    }

    fn is_sensitive_key(key: &str) -> bool {
        let key_lower = key.to_lowercase();
        key_lower.contains("key")
            || key_lower.contains("token")
            || key_lower.contains("password")
            || key_lower.contains("passwd")
            || key_lower.contains("secret")
            || key_lower.contains("credential")
            || key_lower.contains("auth")
    }
}

/// What to include when logging one side of an exchange
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpLoggingOptions {
    pub log_headers: bool,
    pub log_body: bool,
    /// When non-empty, only these headers are logged
    pub headers_to_include: Vec<String>,
    pub headers_to_exclude: Vec<String>,
    /// Sensitive headers logged in clear text
    pub headers_to_unmask: Vec<String>,
}

impl HttpLoggingOptions {
    /// Headers to log, filtered and masked
    pub fn loggable_headers(&self, headers: &Headers) -> Vec<(String, String)> {
        let listed = |list: &[String], name: &str| list.iter().any(|h| h.eq_ignore_ascii_case(name));

        headers
            .iter()
            .filter(|(name, _)| {
                if self.headers_to_include.is_empty() {
                    !listed(&self.headers_to_exclude, name)
                } else {
                    listed(&self.headers_to_include, name)
                }
            })
            .map(|(name, value)| {
                let sensitive = SENSITIVE_HEADERS
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(name));
                let value = if sensitive && !listed(&self.headers_to_unmask, name) {
                    REDACTED.to_string()
                } else {
                    value.to_string()
                };
                (name.to_string(), value)
            })
            .collect()
    }
}

/// Request/response logger used by the call pipeline; a no-op unless enabled
#[derive(Debug, Clone)]
pub struct SdkLogger {
    enabled: bool,
    level: Level,
    request: HttpLoggingOptions,
    response: HttpLoggingOptions,
}

impl Default for SdkLogger {
    fn default() -> Self {
        Self::disabled()
    }
}

macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::error!($($arg)+)
        } else if level == Level::WARN {
            tracing::warn!($($arg)+)
        } else if level == Level::INFO {
            tracing::info!($($arg)+)
        } else if level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    }};
}

impl SdkLogger {
    /// Enabled logger at `INFO` without headers or bodies
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            level: Level::INFO,
            request: HttpLoggingOptions::default(),
            response: HttpLoggingOptions::default(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_request_options(mut self, options: HttpLoggingOptions) -> Self {
        self.request = options;
        self
    }

    pub fn with_response_options(mut self, options: HttpLoggingOptions) -> Self {
        self.response = options;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log_request(&self, request: &HttpRequest) {
        if !self.enabled {
            return;
        }
        let content_type = request.headers().get("content-type").unwrap_or("");
        event_at!(
            self.level,
            method = %request.method(),
            url = %request.url(),
            content_type = content_type,
            "HTTP request"
        );
        if self.request.log_headers {
            let headers = self.request.loggable_headers(request.headers());
            event_at!(self.level, headers = ?headers, "HTTP request headers");
        }
        if self.request.log_body {
            if let Some(body) = request.body().as_text() {
                let body = redaction::redact_body(body);
                event_at!(self.level, body = %body, "HTTP request body");
            }
        }
    }

    pub fn log_response(&self, response: &HttpResponse) {
        if !self.enabled {
            return;
        }
        let content_type = response.headers.get("content-type").unwrap_or("");
        event_at!(
            self.level,
            status = response.status,
            content_type = content_type,
            content_length = response.body.len(),
            "HTTP response"
        );
        if self.response.log_headers {
            let headers = self.response.loggable_headers(&response.headers);
            event_at!(self.level, headers = ?headers, "HTTP response headers");
        }
        if self.response.log_body {
            let body = redaction::redact_body(&response.text());
            event_at!(self.level, body = %body, "HTTP response body");
        }
    }
}
