//! Record sink port

use crate::domain::MetadataRecord;

/// Append-only destination for processed item records
///
/// Implementations must serialize concurrent writers internally so that
/// each record lands as one intact unit.
#[async_trait::async_trait]
pub trait IRecordSink: Send + Sync {
    async fn write(&self, record: &MetadataRecord) -> anyhow::Result<()>;
}
