//! Response descriptor returned by a transport

use std::time::Duration;

use serde_json::Value;

use crate::convert::dates;
use crate::http::headers::Headers;

/// Buffered HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Whether the status lies in 200-299
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON, `None` when it is empty or not JSON
    pub fn json(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    pub fn has_empty_body(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Server-suggested delay from the `Retry-After` header.
    ///
    /// Accepts delta-seconds (optionally suffixed with `s`) or an HTTP-date;
    /// dates in the past yield a zero delay and delays too large for a
    /// `Duration` saturate at `Duration::MAX`.
    pub fn retry_after(&self) -> Option<Duration> {
        let raw = self.headers.get("Retry-After")?.trim();
        let seconds = raw.strip_suffix('s').unwrap_or(raw).trim();
        if let Ok(seconds) = seconds.parse::<f64>() {
            if seconds.is_finite() && seconds >= 0.0 {
                return Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX));
            }
            return None;
        }
        let at = dates::parse_rfc1123(raw).ok()?;
        let delta = at.signed_duration_since(chrono::Utc::now());
        Some(delta.to_std().unwrap_or(Duration::ZERO))
    }
}
