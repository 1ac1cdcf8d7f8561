//! Integration tests for AND / OR auth composition

mod common;

use std::sync::Arc;

use apiwire_core::{
    ApiCall, AuthGroup, BasicAuthManager, BearerAuthManager, Error, GlobalConfiguration,
    HeaderAuthManager, Method, QueryAuthManager, RequestBuilder, ResponseHandler,
};
use common::{base_config, response, ScriptedTransport};

fn config() -> GlobalConfiguration {
    GlobalConfiguration::builder()
        .base_url("https://api.example.com")
        .auth("basic", BasicAuthManager::with_credentials("ada", "secret"))
        .auth("bearer", BearerAuthManager::new(None))
        .auth("key", HeaderAuthManager::new("X-Api-Key", Some("k-123".to_string())))
        .auth("query", QueryAuthManager::new("api_key", None))
        .build()
        .unwrap()
}

fn build(auth: AuthGroup) -> apiwire_core::Result<apiwire_core::HttpRequest> {
    RequestBuilder::setup(Method::GET, "/me")
        .with_auth(auth)
        .build(&config())
}

#[test]
fn test_or_aggregates_every_failing_leaf_in_order() {
    let err = build(AuthGroup::or([AuthGroup::single("bearer"), AuthGroup::single("query")]))
        .unwrap_err();

    let Error::Auth(auth) = &err else {
        panic!("expected an auth error, got {:?}", err);
    };
    assert_eq!(auth.reasons().len(), 2);
    assert_eq!(
        err.to_string(),
        "Missing required auth credentials:\n\
         -> Bearer authentication is missing `access token`\n\
         -> `api_key` query parameter is not set"
    );
}

#[test]
fn test_or_applies_only_validated_leaves() {
    let request = build(AuthGroup::or([
        AuthGroup::single("bearer"),
        AuthGroup::single("key"),
        AuthGroup::single("query"),
    ]))
    .unwrap();

    assert_eq!(request.headers().get("x-api-key"), Some("k-123"));
    assert!(request.headers().get("Authorization").is_none());
    assert!(request.query_value("api_key").is_none());
}

#[test]
fn test_and_stops_at_first_failing_child() {
    let err = build(AuthGroup::and([
        AuthGroup::single("query"),
        AuthGroup::single("bearer"),
    ]))
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("`api_key` query parameter is not set"));
    assert!(!message.contains("Bearer"));
}

#[test]
fn test_and_applies_all_children() {
    let request = build(AuthGroup::and([AuthGroup::single("basic"), AuthGroup::single("key")]))
        .unwrap();
    assert_eq!(
        request.headers().get("Authorization"),
        Some("Basic YWRhOnNlY3JldA==")
    );
    assert_eq!(request.headers().get("X-Api-Key"), Some("k-123"));
}

#[test]
fn test_nested_groups() {
    // (bearer AND key) OR basic: the AND branch fails, basic still applies
    let request = build(AuthGroup::or([
        AuthGroup::and([AuthGroup::single("bearer"), AuthGroup::single("key")]),
        AuthGroup::single("basic"),
    ]))
    .unwrap();
    assert!(request.headers().get("Authorization").unwrap().starts_with("Basic "));
    assert!(request.headers().get("X-Api-Key").is_none());
}

#[test]
fn test_unregistered_scheme() {
    let err = build(AuthGroup::single("oauth")).unwrap_err();
    assert!(err.to_string().contains("`oauth` is not a registered auth scheme"));
}

#[tokio::test]
async fn test_auth_failure_sends_nothing() {
    let transport = ScriptedTransport::new([response(200, "")]);
    let config = base_config(transport.clone())
        .auth("bearer", BearerAuthManager::new(None))
        .build()
        .unwrap();

    let result = ApiCall::new(Arc::new(config))
        .request(RequestBuilder::setup(Method::GET, "/me").with_auth(AuthGroup::single("bearer")))
        .response(ResponseHandler::void())
        .execute()
        .await;

    assert!(matches!(result, Err(Error::Auth(_))));
    assert_eq!(transport.send_count(), 0);
}
