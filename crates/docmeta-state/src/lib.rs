//! docmeta State - Local persistence for the delta worker
//!
//! File-based adapters for:
//! - The delta cursor (one JSON document, replaced atomically)
//! - Processed item records (NDJSON, append-only)
//!
//! ## Architecture
//!
//! This crate implements the `ICursorStore` and `IRecordSink` ports from
//! `docmeta-core`. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! ## Key Components
//!
//! - [`FileCursorStore`] - `ICursorStore` backed by a JSON file
//! - [`NdjsonRecordSink`] - `IRecordSink` appending one JSON line per record
//! - [`StateError`] - Error types for state operations
//!
//! ## Usage
//!
//! ```no_run
//! use docmeta_state::{FileCursorStore, NdjsonRecordSink};
//!
//! let cursor = FileCursorStore::new(".state/delta-cursor.json");
//! let sink = NdjsonRecordSink::new(".out/metadata.ndjson");
//! // Hand both to the delta engine as ports...
//! ```

pub mod cursor_store;
pub mod sink;

use std::path::PathBuf;

pub use cursor_store::FileCursorStore;
pub use sink::NdjsonRecordSink;

/// Errors that can occur during state operations
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Reading or writing a state file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization of a stored document failed
    #[error("Serialization error in {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StateError::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Creates the parent directory of `path` if it has one
pub(crate) async fn ensure_parent(path: &std::path::Path) -> Result<(), StateError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StateError::io(parent, e)),
        _ => Ok(()),
    }
}
