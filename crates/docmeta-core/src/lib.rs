//! docmeta Core - Domain logic, configuration and ports
//!
//! This crate contains the hexagonal core of the metadata worker:
//! - **Domain types** - `CursorState`, `DeltaPage`, `DriveItem`, `ItemDetail`,
//!   `MetadataRecord`, `ItemOutcome`
//! - **Field diffing** - deciding which generated fields must be written back
//! - **Metadata generation** - the default extension-driven generator
//! - **Port definitions** - traits for adapters: `IDocumentLibrary`,
//!   `ICursorStore`, `IRecordSink`, `IMetadataGenerator`, `ICredentialProvider`
//!
//! # Architecture
//!
//! The domain module is pure and performs no I/O. Ports define the trait
//! interfaces that adapter crates (`docmeta-graph`, `docmeta-state`)
//! implement, and the sync engine (`docmeta-sync`) drives them.

pub mod config;
pub mod domain;
pub mod metadata;
pub mod ports;
