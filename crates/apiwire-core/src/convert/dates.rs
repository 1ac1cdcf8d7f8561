//! Date and time converters
//!
//! Three wire formats are supported:
//! - RFC 3339 (`2024-05-01T10:00:00Z`), chrono's default serde form
//! - RFC 1123 / HTTP-date (`Wed, 01 May 2024 10:00:00 GMT`)
//! - Unix timestamps in seconds
//!
//! The `rfc1123` and `unix_timestamp` modules plug into
//! `#[serde(with = "...")]`; the `*_value` functions are parameter
//! serializers converting an RFC 3339 string into the target format.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::{Error, Result};

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn parse_rfc3339(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Deserialization {
            message: format!("`{}` is not an RFC 3339 date-time", text),
            source: Some(e.into()),
        })
}

pub fn format_rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

/// Parse an HTTP-date such as `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn parse_rfc1123(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Deserialization {
            message: format!("`{}` is not an RFC 1123 date", text),
            source: Some(e.into()),
        })
}

pub fn format_rfc1123(value: &DateTime<Utc>) -> String {
    value.format(RFC1123_FORMAT).to_string()
}

pub fn from_unix_timestamp(seconds: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| Error::Deserialization {
            message: format!("{} is out of range for a timestamp", seconds),
            source: None,
        })
}

pub fn to_unix_timestamp(value: &DateTime<Utc>) -> i64 {
    value.timestamp()
}

fn rfc3339_input(value: &Value) -> anyhow::Result<DateTime<Utc>> {
    let text = value
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("expected an RFC 3339 string, found {}", value))?;
    Ok(parse_rfc3339(text)?)
}

/// Parameter serializer: RFC 3339 string to HTTP-date string
pub fn rfc1123_value(value: &Value) -> anyhow::Result<Value> {
    Ok(Value::String(format_rfc1123(&rfc3339_input(value)?)))
}

/// Parameter serializer: RFC 3339 string to Unix timestamp
pub fn unix_timestamp_value(value: &Value) -> anyhow::Result<Value> {
    Ok(Value::from(to_unix_timestamp(&rfc3339_input(value)?)))
}

/// `#[serde(with = "apiwire_core::convert::dates::rfc1123")]`
pub mod rfc1123 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_rfc1123(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_rfc1123(&text).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "apiwire_core::convert::dates::unix_timestamp")]`
pub mod unix_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(super::to_unix_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        super::from_unix_timestamp(seconds).map_err(serde::de::Error::custom)
    }
}
