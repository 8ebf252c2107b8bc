//! GraphDocumentLibrary - IDocumentLibrary implementation for Microsoft Graph API
//!
//! Wraps the [`GraphClient`] and delegates to the delta and fields modules
//! to fulfil the [`IDocumentLibrary`] port contract.
//!
//! ## Design Notes
//!
//! - Site and drive resolution failures are reported as
//!   [`LibraryError::Configuration`]: they can only be fixed by changing the
//!   configured site URL or drive name.
//! - Item detail parsing is lenient like delta parsing; a missing
//!   `listItem` simply yields no existing fields.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use docmeta_core::domain::{DeltaPage, FieldMap, ItemDetail, SiteLocator};
use docmeta_core::ports::{IDocumentLibrary, LibraryError};

use crate::client::GraphClient;
use crate::delta::{parse_utc, DeltaParser};
use crate::fields::{encode_segment, FieldsUpdater};
use crate::GraphError;

// ============================================================================
// Graph API response types
// ============================================================================

/// Response from `GET /sites/{host}:{path}`
#[derive(Debug, Deserialize)]
struct GraphSite {
    id: Option<String>,
}

/// Response from `GET /sites/{site}/drives`
#[derive(Debug, Deserialize)]
struct GraphDriveList {
    #[serde(default)]
    value: Vec<GraphDrive>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphDrive {
    id: Option<String>,
    name: Option<String>,
}

/// Response from `GET /drives/{drive}/items/{item}?$expand=listItem($expand=fields)`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GraphItemDetail {
    size: Option<u64>,
    created_date_time: Option<String>,
    created_by: Option<GraphIdentitySet>,
    list_item: Option<GraphListItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GraphIdentitySet {
    user: Option<GraphIdentity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GraphIdentity {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GraphListItem {
    fields: Option<Map<String, Value>>,
}

impl From<GraphItemDetail> for ItemDetail {
    fn from(detail: GraphItemDetail) -> Self {
        let fields: FieldMap = detail
            .list_item
            .and_then(|li| li.fields)
            .unwrap_or_default()
            .into_iter()
            .filter(|(key, _)| !key.starts_with('@'))
            .collect();

        ItemDetail {
            size: detail.size.unwrap_or(0),
            created_at: detail.created_date_time.as_deref().and_then(parse_utc),
            created_by: detail
                .created_by
                .and_then(|c| c.user)
                .and_then(|u| u.display_name),
            fields,
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(body: Value, what: &str) -> Result<T, GraphError> {
    serde_json::from_value(body)
        .map_err(|e| GraphError::InvalidResponse(format!("{what}: {e}")))
}

// ============================================================================
// GraphDocumentLibrary
// ============================================================================

/// Document library adapter backed by Microsoft Graph
#[derive(Debug, Clone)]
pub struct GraphDocumentLibrary {
    client: Arc<GraphClient>,
    fields: FieldsUpdater,
}

impl GraphDocumentLibrary {
    pub fn new(client: Arc<GraphClient>) -> Self {
        let fields = FieldsUpdater::new(Arc::clone(&client));
        Self { client, fields }
    }

    /// Returns a reference to the underlying client
    pub fn client(&self) -> &Arc<GraphClient> {
        &self.client
    }
}

#[async_trait]
impl IDocumentLibrary for GraphDocumentLibrary {
    async fn resolve_site_id(
        &self,
        site_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LibraryError> {
        let site = SiteLocator::parse(site_url)
            .map_err(|e| LibraryError::Configuration(e.to_string()))?;

        let encoded_path: Vec<String> = site.path.split('/').map(encode_segment).collect();
        let path = if site.path.is_empty() {
            format!("/sites/{}", site.host)
        } else {
            format!("/sites/{}:{}", site.host, encoded_path.join("/"))
        };

        let body = match self.client.get_json(&path, cancel).await {
            Ok(body) => body,
            Err(GraphError::NotFound(_)) => {
                return Err(LibraryError::Configuration(format!(
                    "Site not found: {site_url}"
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let site_id = decode::<GraphSite>(body, "site")?
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                LibraryError::Configuration(format!(
                    "Unable to resolve site id from site URL {site_url}"
                ))
            })?;

        info!(site_id = %site_id, "Resolved site");
        Ok(site_id)
    }

    async fn resolve_drive_id(
        &self,
        site_id: &str,
        drive_name: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LibraryError> {
        let mut link = format!("/sites/{}/drives", encode_segment(site_id));

        loop {
            let list: GraphDriveList = decode(self.client.get_json(&link, cancel).await?, "drives")?;

            let found = list
                .value
                .into_iter()
                .filter(|d| {
                    d.name
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(drive_name))
                })
                .find_map(|d| d.id.filter(|id| !id.trim().is_empty()));

            if let Some(drive_id) = found {
                info!(drive_id = %drive_id, drive_name, "Resolved drive");
                return Ok(drive_id);
            }

            match list.next_link {
                Some(next) => link = next,
                None => {
                    return Err(LibraryError::Configuration(format!(
                        "Drive '{drive_name}' not found on site"
                    )))
                }
            }
        }
    }

    fn initial_delta_link(&self, drive_id: &str, folder_path: Option<&str>) -> String {
        let root = match folder_path.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
            Some(folder) => {
                let encoded: Vec<String> = folder.split('/').map(encode_segment).collect();
                format!("root:/{}:", encoded.join("/"))
            }
            None => "root".to_string(),
        };

        self.client
            .url_for(&format!("/drives/{}/{}/delta", encode_segment(drive_id), root))
    }

    async fn fetch_page(
        &self,
        link: &str,
        cancel: &CancellationToken,
    ) -> Result<DeltaPage, LibraryError> {
        let body = self.client.get_json(link, cancel).await?;
        let page = DeltaParser::parse_page(&body)?;
        debug!(link, items = page.items.len(), "Fetched delta page");
        Ok(page)
    }

    async fn get_item_detail(
        &self,
        drive_id: &str,
        item_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ItemDetail, LibraryError> {
        let path = format!(
            "/drives/{}/items/{}?$expand=listItem($expand=fields)",
            encode_segment(drive_id),
            encode_segment(item_id)
        );
        let body = self.client.get_json(&path, cancel).await?;
        let detail: GraphItemDetail = decode(body, "item detail")?;
        Ok(detail.into())
    }

    async fn update_fields(
        &self,
        drive_id: &str,
        item_id: &str,
        fields: &FieldMap,
        cancel: &CancellationToken,
    ) -> Result<bool, LibraryError> {
        Ok(self
            .fields
            .update_fields(drive_id, item_id, fields, cancel)
            .await?)
    }
}
