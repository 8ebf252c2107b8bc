//! Credential providers for Microsoft Graph API
//!
//! The worker runs unattended, so it authenticates as an application with
//! the OAuth2 client-credentials grant against the tenant's Microsoft
//! identity platform endpoint.
//!
//! ## Components
//!
//! - [`StaticTokenProvider`] - Fixed bearer token (tests, manual runs)
//! - [`ClientCredentialsConfig`] - Tenant, client and secret for the grant
//! - [`ClientCredentialsProvider`] - Token acquisition with in-memory caching

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use docmeta_core::ports::ICredentialProvider;
use oauth2::{
    basic::BasicClient, ClientId, ClientSecret, EndpointNotSet, EndpointSet, Scope,
    TokenResponse, TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Scope requesting every application permission granted to the client
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Microsoft identity platform authority
const AUTHORITY: &str = "https://login.microsoftonline.com";

/// Tokens are renewed this long before they expire
const EXPIRY_MARGIN_SECS: i64 = 60;

// ============================================================================
// StaticTokenProvider
// ============================================================================

/// Returns the same token on every call
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl ICredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

// ============================================================================
// ClientCredentialsConfig
// ============================================================================

/// Configuration for the client-credentials grant
#[derive(Clone)]
pub struct ClientCredentialsConfig {
    /// Directory (tenant) ID
    pub tenant_id: String,
    /// Application (client) ID
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// OAuth scope to request
    pub scope: String,
    /// Token endpoint; derived from the tenant unless overridden
    pub token_url: String,
}

impl std::fmt::Debug for ClientCredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl ClientCredentialsConfig {
    /// Creates a config for the Graph default scope on the tenant's endpoint
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        let token_url = format!("{AUTHORITY}/{tenant_id}/oauth2/v2.0/token");
        Self {
            tenant_id,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
            token_url,
        }
    }

    /// Overrides the token endpoint (useful for testing)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

// ============================================================================
// ClientCredentialsProvider
// ============================================================================

#[derive(Debug, Clone)]
struct CachedToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

type TokenClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Acquires application tokens and caches them until shortly before expiry
///
/// Concurrent callers that find the cache stale wait on the same lock, so
/// only one of them hits the token endpoint.
pub struct ClientCredentialsProvider {
    client: TokenClient,
    http_client: reqwest::Client,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ClientCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsProvider")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ClientCredentialsProvider {
    /// Creates a provider from the given configuration
    pub fn new(config: &ClientCredentialsConfig) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?);

        // The token endpoint must not be followed through redirects
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build token HTTP client")?;

        Ok(Self {
            client,
            http_client,
            scope: config.scope.clone(),
            cache: Mutex::new(None),
        })
    }

    async fn fetch(&self) -> Result<CachedToken> {
        debug!(scope = %self.scope, "Requesting application token");

        let token_result = self
            .client
            .exchange_client_credentials()
            .add_scope(Scope::new(self.scope.clone()))
            .request_async(&self.http_client)
            .await
            .context("Client credentials token request failed")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        info!(expires_at = %expires_at, "Obtained application token");

        Ok(CachedToken {
            secret: token_result.access_token().secret().to_string(),
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl ICredentialProvider for ClientCredentialsProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.secret.clone());
        }

        let token = self.fetch().await?;
        let secret = token.secret.clone();
        *cache = Some(token);
        Ok(secret)
    }
}
