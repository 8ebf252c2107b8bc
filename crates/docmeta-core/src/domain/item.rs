//! Delta page and item snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fields::FieldMap;

/// One entry of the delta feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    pub web_url: Option<String>,
    /// `parentReference.path` as reported by the service
    pub parent_path: Option<String>,
    pub last_modified_utc: Option<DateTime<Utc>>,
    pub is_file: bool,
    pub is_folder: bool,
    pub is_deleted: bool,
}

impl DriveItem {
    /// Whether the engine should process this entry.
    ///
    /// Deleted entries are excluded even when they also carry a file marker.
    pub fn is_eligible(&self) -> bool {
        self.is_file && !self.is_folder && !self.is_deleted && !self.id.trim().is_empty()
    }
}

/// One parsed page of the delta feed
///
/// At most one of `next_link` / `delta_link` is set. A page with neither is
/// terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaPage {
    pub items: Vec<DriveItem>,
    pub next_link: Option<String>,
    pub delta_link: Option<String>,
}

impl DeltaPage {
    /// Eligible items in feed order
    pub fn eligible_items(&self) -> impl Iterator<Item = &DriveItem> {
        self.items.iter().filter(|i| i.is_eligible())
    }
}

/// Per-item detail fetched before generating metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDetail {
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    /// Current list-item fields, annotation keys removed
    pub fields: FieldMap,
}
