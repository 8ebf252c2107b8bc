//! Integration tests for the GraphClient retry policy
//!
//! Verifies status-driven recovery against a wiremock server:
//! - 429 backs off, reduces the shared limiter and retries
//! - 503 on GET is retried; other 4xx map to typed errors
//! - PATCH 404 fails without retry; PATCH 5xx retries up to the attempt cap

use std::sync::Arc;

use docmeta_graph::rate_limit::AdaptiveRateLimiter;
use docmeta_graph::GraphError;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_get_json_sends_bearer_token() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("GET"))
        .and(path("/sites/site-1"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "site-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let body = client
        .get_json("/sites/site-1", &CancellationToken::new())
        .await
        .expect("GET failed");
    assert_eq!(body["id"], "site-1");
}

#[tokio::test]
async fn test_get_429_reduces_rate_and_retries() {
    let server = wiremock::MockServer::start().await;
    let limiter = Arc::new(AdaptiveRateLimiter::new(40));
    let client = common::client_with_limiter(&server, Arc::clone(&limiter));

    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let body = client
        .get_json("/throttled", &CancellationToken::new())
        .await
        .expect("GET should succeed after throttling");
    assert_eq!(body["ok"], true);

    // 40 → 20 → 10 on the two 429s, then +5 on success
    assert_eq!(limiter.stats().0, 15);
}

#[tokio::test]
async fn test_get_429_does_not_consume_attempt_budget() {
    let (server, client) = common::setup_client().await;

    // Four throttles exceed max_attempts (3) but not the throttle budget
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    assert!(client.get_json("/busy", &CancellationToken::new()).await.is_ok());
}

#[tokio::test]
async fn test_get_429_budget_exhausted() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("GET"))
        .and(path("/always-busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(11)
        .mount(&server)
        .await;

    let err = client
        .get_json("/always-busy", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::TooManyRequests { .. }));
}

#[tokio::test]
async fn test_get_503_retried_then_succeeds() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(&server)
        .await;

    let body = client
        .get_json("/flaky", &CancellationToken::new())
        .await
        .expect("GET should succeed on third attempt");
    assert!(body["value"].is_array());
}

#[tokio::test]
async fn test_get_503_exhausts_attempts() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client
        .get_json("/down", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::ServerError { .. }));
}

#[tokio::test]
async fn test_get_typed_errors_without_retry() {
    let (server, client) = common::setup_client().await;

    for (route, status) in [("/missing", 404), ("/gone", 410), ("/denied", 403), ("/bad", 400), ("/boom", 500)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;
    }

    let cancel = CancellationToken::new();
    assert!(matches!(client.get_json("/missing", &cancel).await, Err(GraphError::NotFound(_))));
    assert!(matches!(client.get_json("/gone", &cancel).await, Err(GraphError::Gone(_))));
    assert!(matches!(client.get_json("/denied", &cancel).await, Err(GraphError::Forbidden(_))));
    assert!(matches!(client.get_json("/bad", &cancel).await, Err(GraphError::Status { .. })));
    assert!(matches!(client.get_json("/boom", &cancel).await, Err(GraphError::ServerError { .. })));
}

#[tokio::test]
async fn test_get_invalid_json_body() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let err = client
        .get_json("/html", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_patch_success_sends_payload() {
    let (server, client) = common::setup_client().await;
    let payload = json!({ "TipoDocumento": "Contrato" });

    Mock::given(method("PATCH"))
        .and(path("/drives/d/items/i/listItem/fields"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
        .expect(1)
        .mount(&server)
        .await;

    let ok = client
        .patch_json("/drives/d/items/i/listItem/fields", &payload, &CancellationToken::new())
        .await
        .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn test_patch_404_fails_without_retry() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("PATCH"))
        .and(path("/drives/d/items/gone/listItem/fields"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let ok = client
        .patch_json(
            "/drives/d/items/gone/listItem/fields",
            &json!({ "A": 1 }),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn test_patch_503_retried_up_to_cap() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("PATCH"))
        .and(path("/drives/d/items/i/listItem/fields"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let ok = client
        .patch_json(
            "/drives/d/items/i/listItem/fields",
            &json!({ "A": 1 }),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn test_patch_500_retried_then_succeeds() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("PATCH"))
        .and(path("/drives/d/items/i/listItem/fields"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/drives/d/items/i/listItem/fields"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let ok = client
        .patch_json(
            "/drives/d/items/i/listItem/fields",
            &json!({ "A": 1 }),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn test_patch_400_returns_false_without_retry() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let ok = client
        .patch_json("/drives/d/items/i/listItem/fields", &json!({}), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn test_cancelled_request_returns_cancelled() {
    let (server, client) = common::setup_client().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(matches!(
        client.get_json("/anything", &cancel).await,
        Err(GraphError::Cancelled)
    ));
    assert!(matches!(
        client.patch_json("/anything", &json!({}), &cancel).await,
        Err(GraphError::Cancelled)
    ));
}
