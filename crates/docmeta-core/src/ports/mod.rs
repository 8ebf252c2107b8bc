//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDocumentLibrary`] - Remote document library (site/drive resolution,
//!   delta pages, item detail, field writes)
//! - [`ICursorStore`] - Persistence of the delta cursor between runs
//! - [`IRecordSink`] - Append-only output of processed item records
//! - [`IMetadataGenerator`] - Derivation of business fields for one file
//! - [`ICredentialProvider`] - Opaque bearer-token acquisition

pub mod credential;
pub mod cursor_store;
pub mod document_library;
pub mod metadata_generator;
pub mod record_sink;

pub use credential::ICredentialProvider;
pub use cursor_store::ICursorStore;
pub use document_library::{IDocumentLibrary, LibraryError};
pub use metadata_generator::{GeneratorInput, IMetadataGenerator};
pub use record_sink::IRecordSink;
