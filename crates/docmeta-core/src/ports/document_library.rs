//! Document library port (driven/secondary port)
//!
//! The remote surface the delta engine consumes. One implementation talks
//! to Microsoft Graph; tests substitute in-memory fakes.
//!
//! ## Design Notes
//!
//! - Unlike the storage ports this one returns a typed [`LibraryError`]:
//!   the engine reacts differently to an expired cursor, a configuration
//!   problem and a cancelled request.
//! - Every method takes the run's cancellation token so a shutdown interrupts
//!   in-flight waits (rate limiting, backoff) promptly.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::{DeltaPage, FieldMap, ItemDetail};

/// Errors surfaced by [`IDocumentLibrary`]
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The addressed resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A persisted delta or continuation link is no longer accepted (410 Gone)
    #[error("Cursor expired: {0}")]
    CursorExpired(String),

    /// The configured site, drive or folder cannot be used
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Any other remote failure (network, auth, retries exhausted, bad payload)
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

/// Remote document library
#[async_trait::async_trait]
pub trait IDocumentLibrary: Send + Sync {
    /// Resolves the site identifier for an absolute site URL
    async fn resolve_site_id(
        &self,
        site_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LibraryError>;

    /// Resolves a drive of `site_id` by display name (case-insensitive)
    ///
    /// Returns [`LibraryError::Configuration`] when no drive matches.
    async fn resolve_drive_id(
        &self,
        site_id: &str,
        drive_name: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LibraryError>;

    /// Link that starts a full delta pass over the drive root or a subfolder
    fn initial_delta_link(&self, drive_id: &str, folder_path: Option<&str>) -> String;

    /// Fetches and parses one delta page
    async fn fetch_page(
        &self,
        link: &str,
        cancel: &CancellationToken,
    ) -> Result<DeltaPage, LibraryError>;

    /// Fetches size, creation metadata and current list-item fields
    async fn get_item_detail(
        &self,
        drive_id: &str,
        item_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ItemDetail, LibraryError>;

    /// Writes `fields` to the item's list-item
    ///
    /// `Ok(false)` means the write was rejected or gave up; only
    /// cancellation is reported as an error by well-behaved adapters.
    async fn update_fields(
        &self,
        drive_id: &str,
        item_id: &str,
        fields: &FieldMap,
        cancel: &CancellationToken,
    ) -> Result<bool, LibraryError>;
}
