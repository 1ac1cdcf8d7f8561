//! Property-based testing strategies for generating test data
//!
//! This module provides proptest strategies for generating random
//! but valid status codes, rule tables, parameter values and URL
//! templates for property testing.

#![cfg(test)]

use proptest::collection::{btree_map, vec};
use proptest::option;
use proptest::prelude::*;
use serde_json::Value;

use crate::http::request::TemplateValue;
use crate::params::ArraySerialization;
use crate::response::ErrorCase;

/// Strategy for generating HTTP status codes, biased towards real ones
pub fn status_code_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        3 => prop_oneof![
            Just(200u16), Just(201), Just(204),
            Just(400), Just(401), Just(403), Just(404), Just(409), Just(422), Just(429),
            Just(500), Just(502), Just(503),
        ],
        1 => 100u16..600,
    ]
}

/// Strategy for generating error case keys: exact codes, bands and `"0"`
pub fn rule_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        status_code_strategy().prop_map(|code| code.to_string()),
        (1u16..6).prop_map(|band| format!("{}XX", band)),
        Just("0".to_string()),
    ]
}

/// Strategy for generating rule tables; each case message names its key
pub fn rule_table_strategy() -> impl Strategy<Value = Vec<(String, ErrorCase)>> {
    vec(rule_key_strategy(), 0..6).prop_map(|keys| {
        let mut table: Vec<(String, ErrorCase)> = Vec::new();
        for key in keys {
            if table.iter().any(|(existing, _)| *existing == key) {
                continue;
            }
            let case = ErrorCase::new(key.clone());
            table.push((key, case));
        }
        table
    })
}

/// Strategy for generating JSON scalars
pub fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-zA-Z0-9 ,|/&=?-]{0,12}".prop_map(Value::String),
    ]
}

/// Strategy for generating query parameter values: scalars, arrays and
/// one level of nested objects
pub fn query_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        json_scalar_strategy(),
        vec(json_scalar_strategy(), 0..4).prop_map(Value::Array),
        btree_map("[a-z]{1,6}", json_scalar_strategy(), 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect())),
    ]
}

/// Strategy for generating array serialization modes
pub fn array_serialization_strategy() -> impl Strategy<Value = ArraySerialization> {
    prop_oneof![
        Just(ArraySerialization::Indexed),
        Just(ArraySerialization::UnIndexed),
        Just(ArraySerialization::Plain),
        Just(ArraySerialization::Csv),
        Just(ArraySerialization::Tsv),
        Just(ArraySerialization::Psv),
        Just(ArraySerialization::None),
    ]
}

/// Strategy for generating template values, encoded or not
pub fn template_value_strategy() -> impl Strategy<Value = TemplateValue> {
    (
        prop_oneof![
            json_scalar_strategy(),
            vec("[a-z0-9]{1,5}".prop_map(Value::String), 0..3).prop_map(Value::Array),
        ],
        any::<bool>(),
    )
        .prop_map(|(value, encode)| TemplateValue { value, encode })
}

/// Strategy for generating URL templates with placeholders and stray slashes
pub fn url_template_strategy() -> impl Strategy<Value = (String, Vec<String>)> {
    (
        prop_oneof![Just("https://api.example.com"), Just("http://localhost:8080/")],
        vec(("[a-z]{1,6}", option::of("[a-z]{1,4}"), any::<bool>()), 1..4),
    )
        .prop_map(|(base, segments)| {
            let mut names = Vec::new();
            let mut template = base.to_string();
            for (literal, placeholder, double_slash) in segments {
                template.push_str(if double_slash { "//" } else { "/" });
                template.push_str(&literal);
                if let Some(name) = placeholder {
                    template.push_str(&format!("/{{{}}}", name));
                    names.push(name);
                }
            }
            (template, names)
        })
}
