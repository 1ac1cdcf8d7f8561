//! Shared test support for integration tests
//!
//! `ScriptedTransport` replays a fixed list of outcomes and records every
//! request it was asked to send, together with the (tokio) time of sending.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apiwire_core::http::Headers;
use apiwire_core::{
    GlobalConfiguration, GlobalConfigurationBuilder, HttpClientConfiguration, HttpInterceptor,
    HttpRequest, HttpResponse, RetryConfig, Transport, TransportError, TransportErrorKind,
};
use async_trait::async_trait;
use tokio::time::Instant;

pub type Outcome = Result<HttpResponse, TransportError>;

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Mutex<Option<Outcome>>,
    sent: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..Default::default()
        })
    }

    /// Answer every request with the same outcome
    pub fn always(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            fallback: Mutex::new(Some(outcome)),
            ..Default::default()
        })
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Time between consecutive sends
    pub fn gaps(&self) -> Vec<Duration> {
        let sent = self.sent.lock().unwrap();
        sent.windows(2).map(|pair| pair[1].0 - pair[0].0).collect()
    }

    pub fn last(&self) -> HttpRequest {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, r)| r.clone())
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        _timeout: Option<Duration>,
    ) -> Result<HttpResponse, TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));
        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }
        self.fallback
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(TransportError::new(TransportErrorKind::Other, "script exhausted")))
    }
}

/// Interceptor that records which hooks ran, in order; clones share the log
#[derive(Default, Clone)]
pub struct RecordingInterceptor {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingInterceptor {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl HttpInterceptor for RecordingInterceptor {
    fn before_request(&self, request: &HttpRequest) {
        self.events
            .lock()
            .unwrap()
            .push(format!("before {}", request.url()));
    }

    fn after_response(&self, _request: &HttpRequest, response: &HttpResponse) {
        self.events
            .lock()
            .unwrap()
            .push(format!("after {}", response.status));
    }
}

pub fn response(status: u16, body: &str) -> Outcome {
    Ok(HttpResponse::new(status, Headers::new(), body))
}

pub fn json_response(status: u16, body: &str) -> Outcome {
    let mut headers = Headers::new();
    headers.insert("Content-Type", "application/json");
    Ok(HttpResponse::new(status, headers, body))
}

pub fn response_with_header(status: u16, name: &str, value: &str) -> Outcome {
    let mut headers = Headers::new();
    headers.insert(name, value);
    Ok(HttpResponse::new(status, headers, ""))
}

pub fn timeout() -> Outcome {
    Err(TransportError::new(TransportErrorKind::Timeout, "deadline elapsed"))
}

/// Deterministic retry policy: 1s base interval, factor 2, no jitter
pub fn retry_policy(retries: u32) -> HttpClientConfiguration {
    HttpClientConfiguration {
        retry: RetryConfig::new(retries)
            .with_retry_interval(Duration::from_secs(1))
            .with_jitter(false),
        ..Default::default()
    }
}

pub fn base_config(transport: Arc<ScriptedTransport>) -> GlobalConfigurationBuilder {
    GlobalConfiguration::builder()
        .base_url("https://api.example.com/v1")
        .transport(transport)
}
