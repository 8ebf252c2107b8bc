//! docmeta Graph - Microsoft Graph adapter
//!
//! Provides the async remote side of the metadata worker:
//! - OAuth2 client-credentials authentication
//! - Adaptive rate limiting shared by all outbound requests
//! - Retrying JSON GET/PATCH client
//! - Delta page parsing
//! - List-item field updates
//!
//! ## Modules
//!
//! - [`auth`] - Credential providers (static token, client credentials)
//! - [`client`] - Authenticated, rate-limited, retrying HTTP client
//! - [`delta`] - Delta page parsing
//! - [`fields`] - List-item field writes
//! - [`provider`] - `IDocumentLibrary` implementation over Graph
//! - [`rate_limit`] - Sliding-window adaptive rate limiter

pub mod auth;
pub mod client;
pub mod delta;
pub mod fields;
pub mod provider;
pub mod rate_limit;

use std::time::Duration;

use docmeta_core::ports::LibraryError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Microsoft Graph API
#[derive(Debug, Error)]
pub enum GraphError {
    /// Authentication credentials are invalid or expired (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource is gone, typically an expired delta link (410)
    #[error("Gone: {0}")]
    Gone(String),

    /// Rate limit still exceeded after the throttle retry budget
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the service last asked us to wait
        retry_after: Duration,
    },

    /// A server-side error persisted through all retries (5xx)
    #[error("Server error {status}: {url}")]
    ServerError {
        status: StatusCode,
        url: String,
    },

    /// Any other unsuccessful status
    #[error("Unexpected status {status}: {url}")]
    Status {
        status: StatusCode,
        url: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// No access token could be obtained
    #[error("Credential error: {0}")]
    Credential(anyhow::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<GraphError> for LibraryError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NotFound(url) => LibraryError::NotFound(url),
            GraphError::Gone(url) => LibraryError::CursorExpired(url),
            GraphError::Cancelled => LibraryError::Cancelled,
            other => LibraryError::Remote(anyhow::Error::new(other)),
        }
    }
}
