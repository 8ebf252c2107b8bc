//! Metadata generator port

use chrono::{DateTime, Utc};

use crate::domain::FieldMap;

/// Facts about one file that generated metadata is derived from
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorInput {
    pub file_name: String,
    /// Parent path as reported by the remote service
    pub parent_path: Option<String>,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    /// Clock reading used for processing timestamps and file age
    pub now: DateTime<Utc>,
}

/// Produces the business fields to write back for one file
///
/// Generation is pure and synchronous; anything slow belongs in an adapter
/// that precomputes its inputs.
pub trait IMetadataGenerator: Send + Sync {
    fn generate(&self, input: &GeneratorInput) -> FieldMap;
}
