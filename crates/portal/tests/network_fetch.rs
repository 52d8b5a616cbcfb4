//! Integration tests for the network helpers using wiremock

use portal::network::{
    NetworkAwareFetch, StaticConnectivity, check_api_health, check_backend_health,
};
use portal::{ErrorCode, PortalConfig};
use portal_core::retry::RetryPolicy;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy(max_retries: u32, timeout: Duration) -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(max_retries)
        .delay(Duration::from_millis(10))
        .timeout(timeout)
        .build()
}

#[tokio::test]
async fn test_get_json_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = NetworkAwareFetch::new(mock_server.uri());
    let body: serde_json::Value = api.get_json("/status").await.unwrap();

    assert_eq!(body["ok"], true);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_server_error_is_retried_then_reported() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let api = NetworkAwareFetch::new(mock_server.uri())
        .with_policy(fast_policy(2, Duration::from_secs(5)));
    let err = api.get("/flaky").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Unknown);
    assert_eq!(err.attempts(), Some(2));
    assert!(err.message().ends_with("HTTP 503: Service Unavailable"));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user-1" })))
        .mount(&mock_server)
        .await;

    let api = NetworkAwareFetch::new(mock_server.uri())
        .with_policy(fast_policy(2, Duration::from_secs(5)));
    let body: serde_json::Value = api.get_json("/profile").await.unwrap();

    assert_eq!(body["id"], "user-1");
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let api = NetworkAwareFetch::new(mock_server.uri())
        .with_policy(fast_policy(2, Duration::from_millis(50)));
    let err = api.get("/slow").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Timeout);
    assert_eq!(err.message(), "request timed out");
    assert_eq!(err.attempts(), Some(2));
}

#[tokio::test]
async fn test_not_found_is_classified() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let api = NetworkAwareFetch::new(mock_server.uri())
        .with_policy(fast_policy(1, Duration::from_secs(5)));
    let err = api.get("/missing").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_post_json_sends_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/feedback"))
        .and(body_json(json!({ "rating": 5 })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = NetworkAwareFetch::new(mock_server.uri());
    let response = api
        .post_json("/feedback", &json!({ "rating": 5 }))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_offline_never_hits_the_server() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let api = NetworkAwareFetch::new(mock_server.uri())
        .with_connectivity(Arc::new(StaticConnectivity::new(false)));
    let err = api.get("/status").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Network);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_health_probe_reports_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/degraded"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = reqwest::Client::new();
    let base = Url::parse(&mock_server.uri()).unwrap();

    let healthy = check_api_health(&client, &base.join("/health").unwrap(), Duration::from_secs(3)).await;
    assert!(healthy.is_healthy);
    assert_eq!(healthy.status, Some(204));
    assert!(healthy.error.is_none());

    let degraded =
        check_api_health(&client, &base.join("/degraded").unwrap(), Duration::from_secs(3)).await;
    assert!(!degraded.is_healthy);
    assert_eq!(degraded.status, Some(503));
}

#[tokio::test]
async fn test_backend_health_uses_configured_endpoint() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/auth/v1/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = reqwest::Client::new();
    let base = Url::parse(&mock_server.uri()).unwrap();
    let config = PortalConfig::new(base.clone(), "publishable-key");

    let backend = check_backend_health(&client, &config).await;
    assert!(backend.is_healthy);

    let config = config.with_health_endpoint(base.join("/api/health").unwrap());
    let app = check_backend_health(&client, &config).await;
    assert!(!app.is_healthy);
    assert_eq!(app.status, Some(503));

    mock_server.verify().await;
}

#[tokio::test]
async fn test_health_probe_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let endpoint = Url::parse(&mock_server.uri()).unwrap();
    let report =
        check_api_health(&reqwest::Client::new(), &endpoint, Duration::from_millis(50)).await;

    assert!(!report.is_healthy);
    assert_eq!(report.status, None);
    assert_eq!(report.error.as_deref(), Some("operation timed out after 50ms"));
}
