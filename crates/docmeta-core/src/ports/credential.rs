//! Credential provider port
//!
//! Token acquisition is opaque to the rest of the system: the API client
//! asks for a bearer token before every request and the provider decides
//! whether to serve a cached one or fetch a new one.

/// Supplies bearer tokens for the remote API
#[async_trait::async_trait]
pub trait ICredentialProvider: Send + Sync {
    /// Returns a currently valid access token
    async fn access_token(&self) -> anyhow::Result<String>;
}
