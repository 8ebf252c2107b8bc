//! docmeta Sync - Delta metadata synchronization engine
//!
//! Provides:
//! - Cursor-based incremental walks over a remote document library
//! - Bounded-concurrency per-item processing
//! - Field write-back limited to what is missing remotely
//!
//! ## Modules
//!
//! - [`engine`] - The delta engine orchestrating one run

pub mod engine;

pub use engine::{DeltaEngine, EngineSettings, RunSummary};

use docmeta_core::ports::LibraryError;
use thiserror::Error;

/// Errors that end a run without persisting the cursor
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configured site, drive or folder cannot be used
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A remote call needed to continue the walk failed
    #[error("Remote library error: {0}")]
    Library(#[source] LibraryError),

    /// The cursor could not be loaded or saved
    #[error("Cursor store error: {0}")]
    CursorStore(#[source] anyhow::Error),

    /// The run was cancelled before it finished
    #[error("Run cancelled")]
    Cancelled,
}

impl From<LibraryError> for SyncError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::Configuration(msg) => SyncError::Configuration(msg),
            LibraryError::Cancelled => SyncError::Cancelled,
            other => SyncError::Library(other),
        }
    }
}
