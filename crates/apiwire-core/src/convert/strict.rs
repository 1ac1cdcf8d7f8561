//! Strict scalar matchers
//!
//! Each matcher accepts exactly one JSON token shape, which makes them
//! suitable as union candidates: `12` is an integer, never a float.

use serde_json::Value;

/// A number written with a fraction or exponent
pub fn float(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(number) if number.is_f64() => number
            .as_f64()
            .ok_or_else(|| format!("{} is not a valid double", number)),
        other => Err(format!("expected a double token, found {}", other)),
    }
}

/// A number without fraction or exponent that fits in `i64`
pub fn integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| format!("{} is not a valid integer", number)),
        other => Err(format!("expected an integer token, found {}", other)),
    }
}

pub fn boolean(value: &Value) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("expected a boolean token, found {}", value))
}

pub fn string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("expected a string token, found {}", other)),
    }
}
