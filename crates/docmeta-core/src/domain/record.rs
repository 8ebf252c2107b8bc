//! Per-item outcomes and output records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fields::FieldMap;
use super::item::DriveItem;

/// Line written to the record sink for every processed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub item_id: String,
    pub name: String,
    pub web_url: Option<String>,
    pub parent_path: Option<String>,
    pub last_modified_utc: Option<DateTime<Utc>>,
    pub fields: FieldMap,
}

impl MetadataRecord {
    pub fn from_item(item: &DriveItem, fields: FieldMap) -> Self {
        Self {
            item_id: item.id.clone(),
            name: item.name.clone(),
            web_url: item.web_url.clone(),
            parent_path: item.parent_path.clone(),
            last_modified_utc: item.last_modified_utc,
            fields,
        }
    }
}

/// Result category for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Fields were written back
    Updated,
    /// Nothing needed writing
    Skipped,
    /// Detail fetch, generation or write failed
    Failed,
}

/// Outcome of processing one item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub item_id: String,
    pub status: OutcomeStatus,
    pub record: Option<MetadataRecord>,
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn updated(item_id: impl Into<String>, record: MetadataRecord) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Updated,
            record: Some(record),
            error: None,
        }
    }

    pub fn skipped(item_id: impl Into<String>, record: MetadataRecord) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Skipped,
            record: Some(record),
            error: None,
        }
    }

    pub fn failed(item_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Failed,
            record: None,
            error: Some(error.into()),
        }
    }
}
