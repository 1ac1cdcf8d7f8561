//! URL template expansion

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::http::request::TemplateValue;

/// Substitute `{name}` placeholders in `template`.
///
/// Arrays expand to `/`-joined segments, `null` and unknown names expand to
/// nothing, and repeated slashes in the path are collapsed afterwards. The
/// result depends only on the inputs, so expanding twice gives the same URL.
pub fn expand(template: &str, values: &[(String, TemplateValue)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(length) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 1..start + length];
        if let Some((_, value)) = values.iter().find(|(key, _)| key == name) {
            out.push_str(&render(value));
        }
        rest = &rest[start + length + 1..];
    }
    out.push_str(rest);

    collapse_slashes(&out)
}

fn render(template_value: &TemplateValue) -> String {
    let segment = |value: &Value| {
        let raw = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if template_value.encode {
            encode_segment(&raw)
        } else {
            raw
        }
    };

    match &template_value.value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(segment)
            .collect::<Vec<_>>()
            .join("/"),
        value => segment(value),
    }
}

/// Everything outside the RFC 3986 unreserved set
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode everything outside the RFC 3986 unreserved set
pub fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

/// Collapse `//` runs in the path, leaving the scheme separator and query alone
fn collapse_slashes(url: &str) -> String {
    let (prefix, rest) = match url.find("://") {
        Some(index) => url.split_at(index + 3),
        None => ("", url),
    };
    let (path, query) = match rest.find('?') {
        Some(index) => rest.split_at(index),
        None => (rest, ""),
    };

    let mut collapsed = String::with_capacity(url.len());
    collapsed.push_str(prefix);
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' && previous_slash {
            continue;
        }
        previous_slash = ch == '/';
        collapsed.push(ch);
    }
    collapsed.push_str(query);
    collapsed
}
