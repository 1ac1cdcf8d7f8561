//! Retry logic with exponential backoff for HTTP requests
//!
//! Each call runs a small state machine: attempt, evaluate the outcome, then
//! either wait and attempt again or hand the outcome back. Transport failures
//! are eligible unless the request itself is invalid; responses are eligible when their status is in the
//! configured set or they carry a `Retry-After` header. The per-request
//! `RetryOption` and the configured method set gate both.
//!
//! The wait before attempt `n` is
//! `max(retry_interval * backoff_factor^(n-1) + jitter, retry_after)`.
//! The larger of the computed backoff and the server hint always wins.

use std::future::Future;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use rand::Rng;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::http::error::TransportError;
use crate::http::response::HttpResponse;
use crate::{Error, Result};

/// Upper bound of the random jitter added to each wait, in milliseconds
const MAX_JITTER_MS: u64 = 100;

/// Cap for a single wait, whether computed or supplied by the server
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Retry configuration shared by every call of a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying
    pub number_of_retries: u32,
    /// Multiplier applied to the interval after every retry (>= 1)
    pub backoff_factor: f64,
    /// Base wait before the first retry, in seconds
    pub retry_interval_secs: f64,
    /// Ceiling on total elapsed time across attempts, in seconds (0 = unbounded)
    pub maximum_retry_wait_time_secs: f64,
    /// Response statuses that trigger a retry
    pub status_codes_to_retry: Vec<u16>,
    /// Methods retried under `RetryOption::EnableForHttpMethod`
    pub request_methods_to_retry: Vec<String>,
    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            number_of_retries: 0,
            backoff_factor: 2.0,
            retry_interval_secs: 1.0,
            maximum_retry_wait_time_secs: 0.0,
            status_codes_to_retry: vec![408, 413, 429, 500, 502, 503, 504, 521, 522, 524],
            request_methods_to_retry: vec!["GET".to_string(), "PUT".to_string()],
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with custom retry count
    pub fn new(number_of_retries: u32) -> Self {
        Self {
            number_of_retries,
            ..Default::default()
        }
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_secs = interval.as_secs_f64();
        self
    }

    pub fn with_maximum_retry_wait_time(mut self, maximum: Duration) -> Self {
        self.maximum_retry_wait_time_secs = maximum.as_secs_f64();
        self
    }

    pub fn with_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.status_codes_to_retry = codes.into_iter().collect();
        self
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request_methods_to_retry = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Ceiling on total elapsed time, `None` when unbounded
    pub fn maximum_retry_wait_time(&self) -> Option<Duration> {
        if self.maximum_retry_wait_time_secs > 0.0 {
            Duration::try_from_secs_f64(self.maximum_retry_wait_time_secs).ok()
        } else {
            None
        }
    }

    /// Validate retry configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(format!(
                "Backoff factor must be a finite number of at least 1, got {}",
                self.backoff_factor
            ));
        }
        if Duration::try_from_secs_f64(self.retry_interval_secs).is_err() {
            return Err(format!(
                "Retry interval must be a non-negative number of seconds within range, got {}",
                self.retry_interval_secs
            ));
        }
        if Duration::try_from_secs_f64(self.maximum_retry_wait_time_secs).is_err() {
            return Err(format!(
                "Maximum retry wait time must be a non-negative number of seconds within range, got {}",
                self.maximum_retry_wait_time_secs
            ));
        }
        Ok(())
    }

    /// Whether `method` is in the configured retryable method set
    pub fn allows_method(&self, method: &Method) -> bool {
        self.request_methods_to_retry
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method.as_str()))
    }

    /// Create the exponential backoff producing the un-jittered waits
    pub fn create_backoff(&self) -> ExponentialBackoff {
        let initial = Duration::try_from_secs_f64(self.retry_interval_secs.max(0.0))
            .map_or(MAX_INTERVAL, |interval| interval.min(MAX_INTERVAL));
        let mut backoff = ExponentialBackoff {
            initial_interval: initial,
            current_interval: initial,
            max_interval: MAX_INTERVAL,
            multiplier: self.backoff_factor.max(1.0),
            randomization_factor: 0.0,
            max_elapsed_time: None, // We handle the wait ceiling separately
            ..Default::default()
        };
        backoff.reset();
        backoff
    }
}

/// Per-request retry override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetryOption {
    /// Retry only methods listed in `RetryConfig::request_methods_to_retry`
    #[default]
    EnableForHttpMethod,
    /// Retry regardless of method
    Enable,
    /// Never retry
    Disable,
}

impl RetryOption {
    /// Whether this option lets `method` be retried under `config`
    pub fn permits(&self, method: &Method, config: &RetryConfig) -> bool {
        match self {
            RetryOption::EnableForHttpMethod => config.allows_method(method),
            RetryOption::Enable => true,
            RetryOption::Disable => false,
        }
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { delay: Duration },
    /// Do not retry the request
    NoRetry,
    /// Waiting would push the call past the configured ceiling
    WaitExceeded { elapsed: Duration, maximum: Duration },
}

/// Retry state for a single call
#[derive(Debug)]
pub struct RetryHandler {
    config: RetryConfig,
    enabled: bool,
    attempts: u32,
    backoff: ExponentialBackoff,
    started: Instant,
}

impl RetryHandler {
    /// Create a handler for one call of `method` under `option`
    pub fn new(config: RetryConfig, method: &Method, option: RetryOption) -> Self {
        let enabled = option.permits(method, &config);
        let backoff = config.create_backoff();
        Self {
            config,
            enabled,
            attempts: 0,
            backoff,
            started: Instant::now(),
        }
    }

    /// Whether the outcome of an attempt is eligible for another attempt
    pub fn is_retryable(&self, outcome: &std::result::Result<HttpResponse, TransportError>) -> bool {
        match outcome {
            Err(error) => error.is_retryable(),
            Ok(response) => {
                !response.is_success()
                    && (self.config.status_codes_to_retry.contains(&response.status)
                        || response.retry_after().is_some())
            }
        }
    }

    /// Determine if a request should be retried based on its outcome
    pub fn should_retry(
        &mut self,
        outcome: &std::result::Result<HttpResponse, TransportError>,
    ) -> RetryDecision {
        if !self.enabled || self.attempts >= self.config.number_of_retries {
            return RetryDecision::NoRetry;
        }

        if !self.is_retryable(outcome) {
            return RetryDecision::NoRetry;
        }

        self.attempts += 1;

        let retry_after = outcome
            .as_ref()
            .ok()
            .and_then(HttpResponse::retry_after)
            .map(|hint| hint.min(MAX_INTERVAL));
        let delay = self.calculate_delay(retry_after);

        if let Some(maximum) = self.config.maximum_retry_wait_time() {
            let elapsed = self.started.elapsed().saturating_add(delay);
            if elapsed > maximum {
                return RetryDecision::WaitExceeded { elapsed, maximum };
            }
        }

        RetryDecision::Retry { delay }
    }

    /// Calculate the delay before the next retry
    fn calculate_delay(&mut self, retry_after: Option<Duration>) -> Duration {
        let exponential = self.backoff.next_backoff().unwrap_or(MAX_INTERVAL);
        let jitter = if self.config.jitter {
            Duration::from_millis(rand::thread_rng().gen_range(0..MAX_JITTER_MS))
        } else {
            Duration::ZERO
        };
        (exponential + jitter).max(retry_after.unwrap_or(Duration::ZERO))
    }

    /// Get the number of retries made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Execute a request with retry logic.
///
/// `send` is invoked once per attempt with the zero-based attempt number.
/// The cancellation token is checked before every attempt and raced against
/// both the in-flight send and the wait between attempts.
pub async fn execute_with_retry<F, Fut>(
    mut send: F,
    mut handler: RetryHandler,
    cancel: Option<&CancellationToken>,
) -> Result<HttpResponse>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<HttpResponse, TransportError>>,
{
    let mut attempt = 0;

    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(Error::Cancelled);
        }

        let outcome = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                outcome = send(attempt) => outcome,
            },
            None => send(attempt).await,
        };

        match handler.should_retry(&outcome) {
            RetryDecision::Retry { delay } => {
                log::warn!(
                    "Request failed (attempt {}), retrying after {:?}: {}",
                    attempt + 1,
                    delay,
                    describe(&outcome)
                );
                match cancel {
                    Some(token) => tokio::select! {
                        _ = token.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    },
                    None => tokio::time::sleep(delay).await,
                }
                attempt += 1;
            }
            RetryDecision::NoRetry => {
                if handler.attempts() > 0 {
                    log::debug!(
                        "Request finished after {} retries: {}",
                        handler.attempts(),
                        describe(&outcome)
                    );
                }
                return outcome.map_err(Error::from);
            }
            RetryDecision::WaitExceeded { elapsed, maximum } => {
                log::error!(
                    "Request failed after {} attempts, retry wait ceiling reached: {}",
                    attempt + 1,
                    describe(&outcome)
                );
                return Err(Error::RetryTimeout {
                    elapsed,
                    maximum,
                    status_code: outcome.ok().map(|response| response.status),
                });
            }
        }
    }
}

fn describe(outcome: &std::result::Result<HttpResponse, TransportError>) -> String {
    match outcome {
        Ok(response) => format!("HTTP {}", response.status),
        Err(error) => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::TransportErrorKind;
    use crate::http::headers::Headers;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn response(status: u16) -> std::result::Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(status, Headers::new(), Vec::new()))
    }

    fn deterministic(retries: u32) -> RetryConfig {
        RetryConfig::new(retries).with_jitter(false)
    }

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.number_of_retries, 0);
        assert_eq!(config.backoff_factor, 2.0);
        assert_eq!(config.retry_interval_secs, 1.0);
        assert!(config.maximum_retry_wait_time().is_none());
        assert!(config.status_codes_to_retry.contains(&503));
        assert!(config.jitter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_small_backoff_factor() {
        assert!(RetryConfig::default().with_backoff_factor(0.5).validate().is_err());
        assert!(RetryConfig::default().with_backoff_factor(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_durations() {
        let config = RetryConfig {
            retry_interval_secs: 1e30,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.create_backoff().initial_interval, MAX_INTERVAL);

        let config = RetryConfig {
            maximum_retry_wait_time_secs: 1e30,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.maximum_retry_wait_time(), None);
    }

    #[test]
    fn test_retry_option_gates_methods() {
        let config = RetryConfig::default();
        assert!(RetryOption::EnableForHttpMethod.permits(&Method::GET, &config));
        assert!(RetryOption::EnableForHttpMethod.permits(&Method::PUT, &config));
        assert!(!RetryOption::EnableForHttpMethod.permits(&Method::POST, &config));
        assert!(RetryOption::Enable.permits(&Method::POST, &config));
        assert!(!RetryOption::Disable.permits(&Method::GET, &config));
    }

    #[test]
    fn test_retry_handler_max_attempts() {
        let mut handler = RetryHandler::new(deterministic(2), &Method::GET, RetryOption::default());
        let outcome = response(500);

        assert!(matches!(handler.should_retry(&outcome), RetryDecision::Retry { .. }));
        assert_eq!(handler.attempts(), 1);
        assert!(matches!(handler.should_retry(&outcome), RetryDecision::Retry { .. }));
        assert_eq!(handler.attempts(), 2);
        assert_eq!(handler.should_retry(&outcome), RetryDecision::NoRetry);
    }

    #[test]
    fn test_non_retryable_outcomes() {
        let mut handler = RetryHandler::new(deterministic(3), &Method::GET, RetryOption::default());
        assert_eq!(handler.should_retry(&response(400)), RetryDecision::NoRetry);
        assert_eq!(handler.should_retry(&response(200)), RetryDecision::NoRetry);
        assert_eq!(handler.attempts(), 0);
    }

    #[test]
    fn test_post_is_not_retried_by_default() {
        let mut handler = RetryHandler::new(deterministic(3), &Method::POST, RetryOption::default());
        let failure = Err(TransportError::new(TransportErrorKind::Connect, "refused"));
        assert_eq!(handler.should_retry(&failure), RetryDecision::NoRetry);
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let mut handler = RetryHandler::new(deterministic(1), &Method::GET, RetryOption::default());
        let failure = Err(TransportError::new(TransportErrorKind::Timeout, "elapsed"));
        assert!(matches!(handler.should_retry(&failure), RetryDecision::Retry { .. }));
    }

    #[test]
    fn test_exponential_backoff() {
        let config = deterministic(3).with_retry_interval(Duration::from_secs(1));
        let mut handler = RetryHandler::new(config, &Method::GET, RetryOption::default());
        let outcome = response(503);

        let delays: Vec<Duration> = (0..3)
            .map(|_| match handler.should_retry(&outcome) {
                RetryDecision::Retry { delay } => delay,
                other => panic!("Expected retry decision, got {:?}", other),
            })
            .collect();

        assert_eq!(
            delays,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_jitter_stays_small_and_positive() {
        let config = RetryConfig::new(1).with_retry_interval(Duration::from_secs(1));
        let mut handler = RetryHandler::new(config, &Method::GET, RetryOption::default());

        if let RetryDecision::Retry { delay } = handler.should_retry(&response(500)) {
            assert!(delay >= Duration::from_secs(1));
            assert!(delay < Duration::from_millis(1000 + MAX_JITTER_MS));
        } else {
            panic!("Expected retry decision");
        }
    }

    // The larger of backoff and Retry-After wins; this is an intentional contract.
    #[test]
    fn test_retry_after_wins_when_longer() {
        let config = deterministic(1).with_retry_interval(Duration::from_millis(10));
        let mut handler = RetryHandler::new(config, &Method::GET, RetryOption::default());
        let mut headers = Headers::new();
        headers.insert("Retry-After", "10");
        let outcome = Ok(HttpResponse::new(429, headers, Vec::new()));

        assert_eq!(
            handler.should_retry(&outcome),
            RetryDecision::Retry { delay: Duration::from_secs(10) }
        );
    }

    #[test]
    fn test_backoff_wins_when_longer_than_retry_after() {
        let config = deterministic(1).with_retry_interval(Duration::from_secs(5));
        let mut handler = RetryHandler::new(config, &Method::GET, RetryOption::default());
        let mut headers = Headers::new();
        headers.insert("Retry-After", "1");
        let outcome = Ok(HttpResponse::new(429, headers, Vec::new()));

        assert_eq!(
            handler.should_retry(&outcome),
            RetryDecision::Retry { delay: Duration::from_secs(5) }
        );
    }

    #[test]
    fn test_huge_retry_after_is_capped() {
        let config = deterministic(1).with_maximum_retry_wait_time(Duration::from_secs(60));
        let mut handler = RetryHandler::new(config, &Method::GET, RetryOption::default());
        let mut headers = Headers::new();
        headers.insert("Retry-After", "1e20");
        let outcome = Ok(HttpResponse::new(503, headers, Vec::new()));

        match handler.should_retry(&outcome) {
            RetryDecision::WaitExceeded { elapsed, .. } => assert!(elapsed >= MAX_INTERVAL),
            other => panic!("Expected the wait ceiling to trip, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_after_header_makes_unlisted_status_retryable() {
        let config = deterministic(1).with_status_codes([]);
        let mut handler = RetryHandler::new(config, &Method::GET, RetryOption::default());
        let mut headers = Headers::new();
        headers.insert("Retry-After", "0");
        let outcome = Ok(HttpResponse::new(418, headers, Vec::new()));

        assert!(matches!(handler.should_retry(&outcome), RetryDecision::Retry { .. }));
    }

    #[test]
    fn test_wait_ceiling() {
        let config = deterministic(3)
            .with_retry_interval(Duration::from_secs(2))
            .with_maximum_retry_wait_time(Duration::from_secs(1));
        let mut handler = RetryHandler::new(config, &Method::GET, RetryOption::default());

        assert!(matches!(
            handler.should_retry(&response(500)),
            RetryDecision::WaitExceeded { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_with_retry_sends_n_plus_one_times() {
        let sends = AtomicU32::new(0);
        let handler = RetryHandler::new(deterministic(3), &Method::GET, RetryOption::default());

        let result = execute_with_retry(
            |_| {
                sends.fetch_add(1, Ordering::SeqCst);
                async { response(503) }
            },
            handler,
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.status, 503);
        assert_eq!(sends.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_with_retry_surfaces_transport_error() {
        let handler = RetryHandler::new(deterministic(1), &Method::GET, RetryOption::default());

        let err = execute_with_retry(
            |_| async { Err(TransportError::new(TransportErrorKind::Connect, "refused")) },
            handler,
            None,
        )
        .await
        .unwrap_err();

        assert!(err.is_transport());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let handler = RetryHandler::new(deterministic(1), &Method::GET, RetryOption::default());

        let err = execute_with_retry(|_| async { response(200) }, handler, Some(&token))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_retry_wait() {
        let token = CancellationToken::new();
        let config = deterministic(5).with_retry_interval(Duration::from_secs(60));
        let handler = RetryHandler::new(config, &Method::GET, RetryOption::default());
        let sends = AtomicU32::new(0);

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = execute_with_retry(
            |_| {
                sends.fetch_add(1, Ordering::SeqCst);
                async { response(503) }
            },
            handler,
            Some(&token),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(sends.load(Ordering::SeqCst), 1);
    }
}
