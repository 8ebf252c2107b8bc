//! Microsoft Graph API client
//!
//! Authenticated JSON GET/PATCH against Microsoft Graph with proactive rate
//! limiting and status-driven retries.
//!
//! ## Retry behaviour
//!
//! | Outcome | GET | PATCH |
//! |---|---|---|
//! | 2xx | parsed body, rate increased | `Ok(true)`, rate increased |
//! | 429 | rate reduced, wait `Retry-After`, retry | same |
//! | 503 | wait `5 s x 2^n`, retry | same |
//! | other 5xx | typed error | wait `1 s x 2^n`, retry |
//! | network / timeout | wait `1 s x 2^n`, retry | same |
//! | 404 | [`GraphError::NotFound`] | `Ok(false)` |
//! | other 4xx | typed error | `Ok(false)` |
//!
//! Non-throttle retries share one attempt budget; 429s have their own.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//! use docmeta_graph::{auth::StaticTokenProvider, client::GraphClient, rate_limit::AdaptiveRateLimiter};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GraphClient::new(
//!     Arc::new(StaticTokenProvider::new("token")),
//!     Arc::new(AdaptiveRateLimiter::new(20)),
//!     Duration::from_secs(100),
//! )?;
//! let site = client.get_json("/sites/contoso.sharepoint.com:/sites/legal", &CancellationToken::new()).await?;
//! println!("{}", site["id"]);
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use docmeta_core::ports::ICredentialProvider;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    rate_limit::{parse_retry_after, AdaptiveRateLimiter},
    GraphError,
};

/// Base URL for Microsoft Graph API v1.0
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

// ============================================================================
// RetryPolicy
// ============================================================================

/// Retry limits and backoff bases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sends allowed for non-throttle failures
    pub max_attempts: u32,
    /// Additional sends allowed for 429 responses
    pub max_throttle_retries: u32,
    /// Backoff base for network errors and non-503 server errors
    pub transient_base: Duration,
    /// Backoff base for 503 Service Unavailable
    pub unavailable_base: Duration,
    /// Wait applied to a 429 without a usable `Retry-After`
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_throttle_retries: 10,
            transient_base: Duration::from_secs(1),
            unavailable_base: Duration::from_secs(5),
            default_retry_after: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `failures` (1-based): `base x 2^(failures-1)`
    pub fn backoff(base: Duration, failures: u32) -> Duration {
        base.saturating_mul(1u32 << failures.saturating_sub(1).min(16))
    }
}

/// Which statuses a request treats as retryable server errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerRetry {
    /// Only 503
    UnavailableOnly,
    /// Every 5xx
    AllServerErrors,
}

/// Terminal result of the retry loop for one request
enum Attempted {
    Success(Response),
    Failed(GraphError),
}

// ============================================================================
// GraphClient
// ============================================================================

/// HTTP client for Microsoft Graph API calls
///
/// Wraps `reqwest::Client` with per-request bearer tokens from an
/// [`ICredentialProvider`], a shared [`AdaptiveRateLimiter`] and a
/// [`RetryPolicy`]. Cheap to share behind `Arc`.
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for relative request paths
    base_url: String,
    credentials: Arc<dyn ICredentialProvider>,
    rate_limiter: Arc<AdaptiveRateLimiter>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .field("rate_limiter", &self.rate_limiter)
            .field("retry", &self.retry)
            .finish()
    }
}

impl GraphClient {
    /// Creates a client with the given request timeout
    pub fn new(
        credentials: Arc<dyn ICredentialProvider>,
        rate_limiter: Arc<AdaptiveRateLimiter>,
        timeout: Duration,
    ) -> Result<Self, GraphError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: GRAPH_BASE_URL.to_string(),
            credentials,
            rate_limiter,
            retry: RetryPolicy::default(),
        })
    }

    /// Overrides the base URL (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the shared rate limiter
    pub fn rate_limiter(&self) -> &Arc<AdaptiveRateLimiter> {
        &self.rate_limiter
    }

    /// Resolves a relative path against the base URL; absolute URLs
    /// (delta and continuation links) are used as-is.
    pub fn url_for(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else if path_or_url.starts_with('/') {
            format!("{}{}", self.base_url, path_or_url)
        } else {
            format!("{}/{}", self.base_url, path_or_url)
        }
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, GraphError> {
        let token = self
            .credentials
            .access_token()
            .await
            .map_err(GraphError::Credential)?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json"))
    }

    // ========================================================================
    // GET
    // ========================================================================

    /// GETs `path_or_url` and parses the body as JSON.
    pub async fn get_json(
        &self,
        path_or_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, GraphError> {
        let url = self.url_for(path_or_url);

        match self
            .send_with_retry(Method::GET, &url, None, ServerRetry::UnavailableOnly, cancel)
            .await?
        {
            Attempted::Success(response) => {
                let body = tokio::select! {
                    _ = cancel.cancelled() => return Err(GraphError::Cancelled),
                    body = response.bytes() => body?,
                };
                serde_json::from_slice(&body)
                    .map_err(|e| GraphError::InvalidResponse(format!("{url}: {e}")))
            }
            Attempted::Failed(err) => Err(err),
        }
    }

    // ========================================================================
    // PATCH
    // ========================================================================

    /// PATCHes `payload` to `path_or_url`.
    ///
    /// Returns `Ok(false)` when the service rejected the write or retries were
    /// exhausted. Only cancellation and credential failures are errors.
    pub async fn patch_json(
        &self,
        path_or_url: &str,
        payload: &Value,
        cancel: &CancellationToken,
    ) -> Result<bool, GraphError> {
        let url = self.url_for(path_or_url);

        match self
            .send_with_retry(
                Method::PATCH,
                &url,
                Some(payload),
                ServerRetry::AllServerErrors,
                cancel,
            )
            .await?
        {
            Attempted::Success(_) => Ok(true),
            Attempted::Failed(err) => {
                warn!(url = %url, error = %err, "PATCH failed");
                Ok(false)
            }
        }
    }

    // ========================================================================
    // Retry loop
    // ========================================================================

    /// Runs one logical request through admission control and retries.
    ///
    /// The outer `Err` is reserved for cancellation and credential failures;
    /// everything else ends as [`Attempted::Failed`] so callers can decide how
    /// to surface it.
    async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Value>,
        server_retry: ServerRetry,
        cancel: &CancellationToken,
    ) -> Result<Attempted, GraphError> {
        let mut failures = 0u32;
        let mut throttles = 0u32;

        loop {
            let mut request = self.request(method.clone(), url).await?;
            if let Some(body) = payload {
                request = request.json(body);
            }

            self.rate_limiter.acquire(cancel).await?;

            let sent = tokio::select! {
                _ = cancel.cancelled() => return Err(GraphError::Cancelled),
                sent = request.send() => sent,
            };

            let response = match sent {
                Ok(response) => response,
                Err(e) if is_transient(&e) => {
                    failures += 1;
                    if failures >= self.retry.max_attempts {
                        warn!(%method, url, attempts = failures, error = %e, "Network retries exhausted");
                        return Ok(Attempted::Failed(GraphError::NetworkError(e)));
                    }
                    let wait = RetryPolicy::backoff(self.retry.transient_base, failures);
                    warn!(%method, url, attempt = failures, wait_ms = wait.as_millis() as u64, error = %e, "Network error, retrying");
                    self.sleep(wait, cancel).await?;
                    continue;
                }
                Err(e) => return Ok(Attempted::Failed(GraphError::NetworkError(e))),
            };

            let status = response.status();

            if status.is_success() {
                self.rate_limiter.adjust_rate(false);
                if failures + throttles > 0 {
                    info!(%method, url, failures, throttles, "Request succeeded after retry");
                }
                return Ok(Attempted::Success(response));
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                self.rate_limiter.adjust_rate(true);
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, self.retry.default_retry_after))
                    .unwrap_or(self.retry.default_retry_after);

                throttles += 1;
                if throttles > self.retry.max_throttle_retries {
                    warn!(%method, url, throttles, "429 retry limit exhausted");
                    return Ok(Attempted::Failed(GraphError::TooManyRequests { retry_after }));
                }

                info!(%method, url, throttles, retry_after_ms = retry_after.as_millis() as u64, "Received 429, backing off");
                self.sleep(retry_after, cancel).await?;
                continue;
            }

            let retry_base = if status == StatusCode::SERVICE_UNAVAILABLE {
                Some(self.retry.unavailable_base)
            } else if status.is_server_error() && server_retry == ServerRetry::AllServerErrors {
                Some(self.retry.transient_base)
            } else {
                None
            };

            match retry_base {
                Some(base) => {
                    failures += 1;
                    if failures >= self.retry.max_attempts {
                        warn!(%method, url, status = status.as_u16(), attempts = failures, "Server error retries exhausted");
                        return Ok(Attempted::Failed(GraphError::ServerError {
                            status,
                            url: url.to_string(),
                        }));
                    }
                    let wait = RetryPolicy::backoff(base, failures);
                    warn!(%method, url, status = status.as_u16(), attempt = failures, wait_ms = wait.as_millis() as u64, "Server error, retrying");
                    self.sleep(wait, cancel).await?;
                }
                None => {
                    debug!(%method, url, status = status.as_u16(), "Request failed");
                    return Ok(Attempted::Failed(status_error(status, url)));
                }
            }
        }
    }

    async fn sleep(&self, wait: Duration, cancel: &CancellationToken) -> Result<(), GraphError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(GraphError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}

/// Whether a transport error is worth retrying
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Maps a non-retried status to its typed error
fn status_error(status: StatusCode, url: &str) -> GraphError {
    let url = url.to_string();
    match status {
        StatusCode::UNAUTHORIZED => GraphError::Unauthorized(url),
        StatusCode::FORBIDDEN => GraphError::Forbidden(url),
        StatusCode::NOT_FOUND => GraphError::NotFound(url),
        StatusCode::GONE => GraphError::Gone(url),
        s if s.is_server_error() => GraphError::ServerError { status: s, url },
        s => GraphError::Status { status: s, url },
    }
}
