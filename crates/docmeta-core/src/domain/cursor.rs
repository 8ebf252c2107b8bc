//! Delta cursor state
//!
//! The cursor is the single record that survives between runs. It carries
//! the resolved site/drive binding and at most one meaningful link:
//!
//! - `continuation_link`: the current pass stopped early, more pages remain
//! - `delta_link`: the pass completed, future polls return only changes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted position in the remote delta feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorState {
    /// Link to the next page of an unfinished pass
    pub continuation_link: Option<String>,
    /// Link returned at the end of a completed pass
    pub delta_link: Option<String>,
    /// Resolved site identifier
    pub site_id: Option<String>,
    /// Resolved drive identifier
    pub drive_id: Option<String>,
    /// Drive display name the `drive_id` was resolved from
    pub drive_name: Option<String>,
    /// When this state was written
    pub saved_at: DateTime<Utc>,
}

impl CursorState {
    /// Link a run should resume from: continuation first, then delta.
    ///
    /// Blank links are treated as absent.
    pub fn resume_link(&self) -> Option<&str> {
        non_blank(self.continuation_link.as_deref()).or_else(|| non_blank(self.delta_link.as_deref()))
    }

    /// Whether the resume link is a delta link (as opposed to a continuation).
    pub fn resumes_from_delta(&self) -> bool {
        non_blank(self.continuation_link.as_deref()).is_none()
            && non_blank(self.delta_link.as_deref()).is_some()
    }

    /// Persisted site id, if usable.
    pub fn site_id(&self) -> Option<&str> {
        non_blank(self.site_id.as_deref())
    }

    /// Persisted drive id, but only when it was resolved for `drive_name`.
    ///
    /// Drive names compare case-insensitively.
    pub fn drive_id_for(&self, drive_name: &str) -> Option<&str> {
        let same_drive = self
            .drive_name
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(drive_name));
        if same_drive {
            non_blank(self.drive_id.as_deref())
        } else {
            None
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
