//! List-item field updates
//!
//! Writes generated metadata into the columns of a document library item:
//! `PATCH /drives/{drive}/items/{item}/listItem/fields`.

use std::sync::Arc;

use docmeta_core::domain::FieldMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{client::GraphClient, GraphError};

/// Relative path of an item's list-item fields
pub fn fields_path(drive_id: &str, item_id: &str) -> String {
    format!(
        "/drives/{}/items/{}/listItem/fields",
        encode_segment(drive_id),
        encode_segment(item_id)
    )
}

/// Percent-encodes one path segment
pub(crate) fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Issues field writes through the shared [`GraphClient`]
#[derive(Debug, Clone)]
pub struct FieldsUpdater {
    client: Arc<GraphClient>,
}

impl FieldsUpdater {
    pub fn new(client: Arc<GraphClient>) -> Self {
        Self { client }
    }

    /// Writes `fields` to the item.
    ///
    /// Returns `Ok(false)` when the write did not happen for any reason other
    /// than cancellation, which is returned as [`GraphError::Cancelled`].
    pub async fn update_fields(
        &self,
        drive_id: &str,
        item_id: &str,
        fields: &FieldMap,
        cancel: &CancellationToken,
    ) -> Result<bool, GraphError> {
        let path = fields_path(drive_id, item_id);
        let payload = Value::Object(fields.clone());

        match self.client.patch_json(&path, &payload, cancel).await {
            Ok(true) => {
                debug!(item_id, count = fields.len(), "Updated fields");
                Ok(true)
            }
            Ok(false) => {
                warn!(item_id, "Failed to update fields");
                Ok(false)
            }
            Err(GraphError::Cancelled) => Err(GraphError::Cancelled),
            Err(e) => {
                error!(item_id, error = %e, "Error updating fields");
                Ok(false)
            }
        }
    }
}
