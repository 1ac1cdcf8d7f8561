//! Error message templates
//!
//! Placeholders are `{$...}` expressions resolved against the exchange:
//!
//! | placeholder                    | renders                                   |
//! |--------------------------------|-------------------------------------------|
//! | `{$statusCode}`                | response status                           |
//! | `{$response.header.<name>}`    | response header, case-insensitive         |
//! | `{$response.body}`             | whole body, compact JSON or raw text      |
//! | `{$response.body#<pointer>}`   | body fragment; empty pointer renders `""` |
//! | `{$request.header.<name>}`     | request header                            |
//! | `{$request.query.<name>}`      | request query value                       |
//! | `{$request.body}` / `#<ptr>`   | request body, as above                    |
//! | `{$request.url}`               | resolved request URL                      |
//! | `{$request.method}`            | request method                            |
//!
//! Anything else inside `{$...}` renders as an empty string.

use serde_json::Value;

use crate::http::body::RequestBody;
use crate::response::error::ExceptionContext;

/// Render `template` against the exchange in `context`
pub fn render(template: &str, context: &ExceptionContext<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{$") {
        let Some(length) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&resolve(&rest[start + 2..start + length], context));
        rest = &rest[start + length + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve(expression: &str, context: &ExceptionContext<'_>) -> String {
    if expression == "statusCode" {
        return context.response().status.to_string();
    }
    if let Some(rest) = expression.strip_prefix("response.") {
        return resolve_response(rest, context);
    }
    if let Some(rest) = expression.strip_prefix("request.") {
        return resolve_request(rest, context);
    }
    String::new()
}

fn resolve_response(expression: &str, context: &ExceptionContext<'_>) -> String {
    let response = context.response();
    if let Some(name) = expression.strip_prefix("header.") {
        return response.headers.get(name).unwrap_or_default().to_string();
    }
    if expression == "body" {
        return match context.response_json() {
            Some(value) => value.to_string(),
            None => response.text(),
        };
    }
    if let Some(pointer) = expression.strip_prefix("body#") {
        return render_pointer(context.response_json(), pointer);
    }
    String::new()
}

fn resolve_request(expression: &str, context: &ExceptionContext<'_>) -> String {
    let request = context.request();
    match expression {
        "url" => return request.url().to_string(),
        "method" => return request.method().to_string(),
        "body" => {
            return match context.request_json() {
                Some(value) => value.to_string(),
                None => request_body_text(request.body()),
            }
        }
        _ => {}
    }
    if let Some(name) = expression.strip_prefix("header.") {
        return request.headers().get(name).unwrap_or_default().to_string();
    }
    if let Some(name) = expression.strip_prefix("query.") {
        return request.query_value(name).map(render_leaf).unwrap_or_default();
    }
    if let Some(pointer) = expression.strip_prefix("body#") {
        return render_pointer(context.request_json(), pointer);
    }
    String::new()
}

fn request_body_text(body: &RequestBody) -> String {
    match body {
        RequestBody::Form(_) => body
            .to_bytes()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
        other => other.as_text().unwrap_or_default().to_string(),
    }
}

fn render_pointer(root: Option<&Value>, pointer: &str) -> String {
    if pointer.is_empty() {
        return String::new();
    }
    let Some(root) = root else {
        return String::new();
    };
    let found = if pointer.starts_with('/') {
        root.pointer(pointer)
    } else {
        root.pointer(&format!("/{}", pointer))
    };
    found.map(render_leaf).unwrap_or_default()
}

/// Strings render unquoted; everything else renders as compact JSON
fn render_leaf(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
