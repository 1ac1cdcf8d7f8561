//! Flattening of structured values into query and form pairs

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How array values are written into query strings and url-encoded forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArraySerialization {
    /// `a[0]=x&a[1]=y`
    #[default]
    Indexed,
    /// `a[]=x&a[]=y`
    UnIndexed,
    /// `a=x&a=y`
    Plain,
    /// `a=x,y`
    Csv,
    /// `a=x<TAB>y`
    Tsv,
    /// `a=x|y`
    Psv,
    /// The array is sent as one compact JSON value
    None,
}

impl ArraySerialization {
    fn separator(&self) -> Option<&'static str> {
        match self {
            ArraySerialization::Csv => Some(","),
            ArraySerialization::Tsv => Some("\t"),
            ArraySerialization::Psv => Some("|"),
            _ => None,
        }
    }
}

/// String form of a parameter value.
///
/// Strings are taken verbatim, `null` becomes empty, arrays of scalars are
/// comma-joined and everything else uses its compact JSON form.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Flatten named values into ordered `(key, value)` pairs.
///
/// Objects nest as `outer[inner]`; arrays follow `mode`; `null` values
/// are dropped.
pub fn flatten_pairs(values: &[(String, Value)], mode: ArraySerialization) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in values {
        flatten_into(key, value, mode, &mut pairs);
    }
    pairs
}

fn flatten_into(key: &str, value: &Value, mode: ArraySerialization, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (field, nested) in map {
                flatten_into(&format!("{}[{}]", key, field), nested, mode, out);
            }
        }
        Value::Array(items) => {
            if let Some(separator) = mode.separator() {
                if items.iter().all(is_scalar) {
                    let joined = items
                        .iter()
                        .filter(|item| !item.is_null())
                        .map(value_to_string)
                        .collect::<Vec<_>>()
                        .join(separator);
                    out.push((key.to_string(), joined));
                    return;
                }
            }
            match mode {
                ArraySerialization::None => out.push((key.to_string(), value.to_string())),
                ArraySerialization::UnIndexed => {
                    let item_key = format!("{}[]", key);
                    for item in items {
                        flatten_into(&item_key, item, mode, out);
                    }
                }
                ArraySerialization::Plain => {
                    for item in items {
                        flatten_into(key, item, mode, out);
                    }
                }
                // Indexed, and delimited modes whose items are not scalars
                _ => {
                    for (index, item) in items.iter().enumerate() {
                        flatten_into(&format!("{}[{}]", key, index), item, mode, out);
                    }
                }
            }
        }
        scalar => out.push((key.to_string(), value_to_string(scalar))),
    }
}

/// Append form-url-encoded pairs to `url`, using `?` or `&` as needed
pub fn append_query(url: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return url.to_string();
    }

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();

    let joiner = match url.find('?') {
        None => "?",
        Some(_) if url.ends_with('?') || url.ends_with('&') => "",
        Some(_) => "&",
    };

    format!("{}{}{}", url, joiner, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(mode: ArraySerialization) -> String {
        let values = vec![("a".to_string(), json!(["x", "y"]))];
        append_query("https://h/p", &flatten_pairs(&values, mode))
    }

    #[test]
    fn test_array_modes() {
        assert_eq!(query(ArraySerialization::Indexed), "https://h/p?a%5B0%5D=x&a%5B1%5D=y");
        assert_eq!(query(ArraySerialization::UnIndexed), "https://h/p?a%5B%5D=x&a%5B%5D=y");
        assert_eq!(query(ArraySerialization::Plain), "https://h/p?a=x&a=y");
        assert_eq!(query(ArraySerialization::Csv), "https://h/p?a=x%2Cy");
        assert_eq!(query(ArraySerialization::Tsv), "https://h/p?a=x%09y");
        assert_eq!(query(ArraySerialization::Psv), "https://h/p?a=x%7Cy");
        assert_eq!(
            query(ArraySerialization::None),
            "https://h/p?a=%5B%22x%22%2C%22y%22%5D"
        );
    }

    #[test]
    fn test_nested_objects_use_brackets() {
        let values = vec![(
            "filter".to_string(),
            json!({"owner": {"name": "ann"}, "ids": [1, 2]}),
        )];
        let pairs = flatten_pairs(&values, ArraySerialization::Indexed);
        assert_eq!(
            pairs,
            vec![
                ("filter[owner][name]".to_string(), "ann".to_string()),
                ("filter[ids][0]".to_string(), "1".to_string()),
                ("filter[ids][1]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_nulls_are_dropped() {
        let values = vec![("a".to_string(), Value::Null), ("b".to_string(), json!(true))];
        assert_eq!(
            flatten_pairs(&values, ArraySerialization::Plain),
            vec![("b".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_append_to_existing_query() {
        let pairs = vec![("b".to_string(), "2".to_string())];
        assert_eq!(append_query("https://h/p?a=1", &pairs), "https://h/p?a=1&b=2");
        assert_eq!(append_query("https://h/p?", &pairs), "https://h/p?b=2");
        assert_eq!(append_query("https://h/p", &[]), "https://h/p");
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("text")), "text");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&json!([1, "a"])), "1,a");
        assert_eq!(value_to_string(&json!({"k": 1})), "{\"k\":1}");
        assert_eq!(value_to_string(&Value::Null), "");
    }
}
