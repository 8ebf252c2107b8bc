//! Microsoft Graph Delta API page parsing
//!
//! The delta query returns the drive's items page by page. Every page but
//! the last carries `@odata.nextLink`; the last one carries
//! `@odata.deltaLink`, which later returns only what changed since.
//!
//! Parsing is lenient: one malformed entry must not cost the
//! run its place in the feed, so missing ids and names become empty strings
//! and unparsable timestamps are dropped.
//!
//! See: <https://learn.microsoft.com/en-us/graph/api/driveitem-delta>

use chrono::{DateTime, Utc};
use docmeta_core::domain::{DeltaPage, DriveItem};
use serde_json::{Map, Value};
use tracing::debug;

use crate::GraphError;

/// Key of the continuation link on an unfinished page
pub const NEXT_LINK_KEY: &str = "@odata.nextLink";

/// Key of the delta link on the final page
pub const DELTA_LINK_KEY: &str = "@odata.deltaLink";

// ============================================================================
// DeltaParser
// ============================================================================

/// Parser for Microsoft Graph delta pages
pub struct DeltaParser;

impl DeltaParser {
    /// Parses one delta page.
    ///
    /// Returns [`GraphError::InvalidResponse`] when `body` is not a JSON
    /// object. A missing or non-array `value` yields no items.
    pub fn parse_page(body: &Value) -> Result<DeltaPage, GraphError> {
        let root = body.as_object().ok_or_else(|| {
            GraphError::InvalidResponse("delta page is not a JSON object".to_string())
        })?;

        let items: Vec<DriveItem> = root
            .get("value")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_object)
                    .map(Self::parse_item)
                    .collect()
            })
            .unwrap_or_default();

        let page = DeltaPage {
            items,
            next_link: string_field(root, NEXT_LINK_KEY),
            delta_link: string_field(root, DELTA_LINK_KEY),
        };

        debug!(
            items = page.items.len(),
            has_next = page.next_link.is_some(),
            has_delta = page.delta_link.is_some(),
            "Parsed delta page"
        );

        Ok(page)
    }

    /// Parses a single drive item entry.
    ///
    /// Facets count by presence of their key, whatever the value.
    pub fn parse_item(entry: &Map<String, Value>) -> DriveItem {
        let parent_path = entry
            .get("parentReference")
            .and_then(Value::as_object)
            .and_then(|parent| string_field(parent, "path"));

        DriveItem {
            id: string_field(entry, "id").unwrap_or_default(),
            name: string_field(entry, "name").unwrap_or_default(),
            web_url: string_field(entry, "webUrl"),
            parent_path,
            last_modified_utc: entry
                .get("lastModifiedDateTime")
                .and_then(Value::as_str)
                .and_then(parse_utc),
            is_file: entry.contains_key("file"),
            is_folder: entry.contains_key("folder"),
            is_deleted: entry.contains_key("deleted"),
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Parses an RFC 3339 timestamp with any offset into UTC
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Tests
// ============================================================================
