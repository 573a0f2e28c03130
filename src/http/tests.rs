//! Tests for the HTTP client module

use super::*;
use crate::auth::{AuthConfig, Authenticator};
use crate::error::Error;
use crate::types::BackoffType;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: String) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(base_url)
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(5),
            Duration::from_millis(50),
        )
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://admanager.googleapis.com/v1/")
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .no_rate_limit()
        .build();

    assert_eq!(
        config.base_url.as_deref(),
        Some("https://admanager.googleapis.com/v1/")
    );
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.max_backoff, Duration::from_secs(30));
    assert!(config.rate_limit.is_none());
}

#[test]
fn test_request_config_merges_page_params() {
    let page = HashMap::from([("pageToken".to_string(), "abc".to_string())]);
    let config = RequestConfig::new()
        .queries(HashMap::from([("pageSize".to_string(), "1000".to_string())]))
        .queries(page)
        .json(json!({"key": "value"}));

    assert_eq!(config.query.get("pageSize"), Some(&"1000".to_string()));
    assert_eq!(config.query.get("pageToken"), Some(&"abc".to_string()));
    assert_eq!(config.body, Some(json!({"key": "value"})));
}

#[test]
fn test_build_url_joins_resource_paths() {
    let client = test_client("https://admanager.googleapis.com/v1/".to_string());

    assert_eq!(
        client.build_url("networks/123/orders"),
        "https://admanager.googleapis.com/v1/networks/123/orders"
    );
    assert_eq!(
        client.build_url("/networks/123/reports/9:run"),
        "https://admanager.googleapis.com/v1/networks/123/reports/9:run"
    );
    assert_eq!(
        client.build_url("https://other.example.com/x"),
        "https://other.example.com/x"
    );
}

#[tokio::test]
async fn test_get_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/networks/1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [{"orderId": "1"}]
        })))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let data: serde_json::Value = client.get_json("networks/1/orders").await.unwrap();

    assert_eq!(data["orders"][0]["orderId"], "1");
}

#[tokio::test]
async fn test_post_json_sends_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/networks/1/reports"))
        .and(body_json(json!({"displayName": "Daily"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "networks/1/reports/77"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let created: serde_json::Value = client
        .post_json_with_config(
            "networks/1/reports",
            RequestConfig::new().json(json!({"displayName": "Daily"})),
        )
        .await
        .unwrap();

    assert_eq!(created["name"], "networks/1/reports/77");
}

#[tokio::test]
async fn test_query_params_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/networks/1/placements"))
        .and(query_param("page_token", "tok"))
        .and(header("user-agent", concat!("tap-ad-manager/", env!("CARGO_PKG_VERSION"))))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let response = client
        .get_with_config(
            "networks/1/placements",
            RequestConfig::new().queries(HashMap::from([(
                "page_token".to_string(),
                "tok".to_string(),
            )])),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_client_error_is_returned_uninterpreted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/networks/1/reports"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad spec"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let response = client
        .post_with_config(
            "networks/1/reports",
            RequestConfig::new().json(json!({"displayName": "x"})),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "bad spec");
}

#[tokio::test]
async fn test_get_json_rejects_client_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let err = client
        .get_json::<serde_json::Value>("missing")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_get_json_rejects_non_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let err = client
        .get_json::<serde_json::Value>("garbage")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_retry_on_500() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let response = client.get_with_config("flaky", RequestConfig::new()).await.unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limit_retry_honors_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_string("Rate limited"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // max_backoff caps the server-requested delay
    let client = test_client(server.uri());
    let response = client.get_with_config("limited", RequestConfig::new()).await.unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_max_retries_exhausted_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/always-fail"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let err = client.get_with_config("always-fail", RequestConfig::new()).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_authenticated_requests_carry_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/networks/1/orders"))
        .and(header("Authorization", "Bearer static"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "static".to_string(),
    })
    .unwrap();
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    let client = HttpClient::with_auth(config, auth).unwrap();

    assert!(client.authenticator().is_some());
    let _: serde_json::Value = client.get_json("networks/1/orders").await.unwrap();
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/networks/1/orders"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2Refresh {
        token_url: format!("{}/token", server.uri()),
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "refresh".to_string(),
    })
    .unwrap();
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    let client = HttpClient::with_auth(config, auth).unwrap();

    let err = client.get_with_config("networks/1/orders", RequestConfig::new()).await.unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_calculate_backoff_strategies() {
    let build = |kind| {
        let config = HttpClientConfig::builder()
            .backoff(kind, Duration::from_millis(100), Duration::from_millis(500))
            .no_rate_limit()
            .build();
        HttpClient::with_config(config).unwrap()
    };

    let constant = build(BackoffType::Constant);
    assert_eq!(constant.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(constant.calculate_backoff(5), Duration::from_millis(100));

    let linear = build(BackoffType::Linear);
    assert_eq!(linear.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));

    let exponential = build(BackoffType::Exponential);
    assert_eq!(exponential.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(exponential.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(exponential.calculate_backoff(10), Duration::from_millis(500));
}

#[test]
fn test_http_client_debug_and_rate_limiter() {
    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("HttpClient"));
    assert!(debug_str.contains("has_authenticator: false"));
    assert!(debug_str.contains("has_rate_limiter: true"));
}
