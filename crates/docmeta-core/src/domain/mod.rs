//! Domain entities and pure business rules
//!
//! - Cursor state persisted between runs
//! - Site addressing derived from the configured URL
//! - Delta page and item snapshots
//! - Field maps and the empty-field diff
//! - Per-item outcomes and output records
//! - Domain-specific error types

pub mod cursor;
pub mod errors;
pub mod fields;
pub mod item;
pub mod record;
pub mod site;

// Re-export commonly used types
pub use cursor::CursorState;
pub use errors::DomainError;
pub use fields::{filter_empty_fields, find_field, is_empty_value, restrict_to, FieldMap};
pub use item::{DeltaPage, DriveItem, ItemDetail};
pub use record::{ItemOutcome, MetadataRecord, OutcomeStatus};
pub use site::SiteLocator;
