//! Shared test helpers for Graph API integration tests
//!
//! Each helper returns a client or library pointing at a wiremock server,
//! with retry delays shrunk to milliseconds.

use std::{sync::Arc, time::Duration};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docmeta_graph::auth::StaticTokenProvider;
use docmeta_graph::client::{GraphClient, RetryPolicy};
use docmeta_graph::provider::GraphDocumentLibrary;
use docmeta_graph::rate_limit::AdaptiveRateLimiter;

/// Retry policy with the default budgets and millisecond delays
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        transient_base: Duration::from_millis(1),
        unavailable_base: Duration::from_millis(1),
        default_retry_after: Duration::from_millis(1),
        ..RetryPolicy::default()
    }
}

/// Builds a client against `server` sharing `limiter`.
pub fn client_with_limiter(server: &MockServer, limiter: Arc<AdaptiveRateLimiter>) -> GraphClient {
    GraphClient::new(
        Arc::new(StaticTokenProvider::new("test-access-token")),
        limiter,
        Duration::from_secs(5),
    )
    .expect("build client")
    .with_base_url(server.uri())
    .with_retry_policy(fast_retry())
}

/// Starts a mock server and returns it with a client pointed at it.
pub async fn setup_client() -> (MockServer, GraphClient) {
    let server = MockServer::start().await;
    let client = client_with_limiter(&server, Arc::new(AdaptiveRateLimiter::new(50)));
    (server, client)
}

/// Starts a mock server and returns it with a document library pointed at it.
pub async fn setup_library() -> (MockServer, GraphDocumentLibrary) {
    let (server, client) = setup_client().await;
    (server, GraphDocumentLibrary::new(Arc::new(client)))
}

/// Mounts `GET /sites/contoso.sharepoint.com:/sites/legal` → `site-1`.
#[allow(dead_code)]
pub async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com:/sites/legal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "site-1",
            "displayName": "Legal"
        })))
        .mount(server)
        .await;
}

/// Mounts `GET /sites/site-1/drives` with two libraries.
#[allow(dead_code)]
pub async fn mount_drives(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sites/site-1/drives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                { "id": "drive-shared", "name": "Shared Documents" },
                { "id": "drive-docs", "name": "Documentos" }
            ]
        })))
        .mount(server)
        .await;
}
