//! Integration tests for delta paging through the document library
//!
//! - Initial delta query on the drive root and on a subfolder
//! - Following nextLink to the final deltaLink
//! - Expired links surfacing as `CursorExpired`

use docmeta_core::ports::{IDocumentLibrary, LibraryError};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_initial_page_from_drive_root() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {
                    "id": "file-001",
                    "name": "contrato.pdf",
                    "webUrl": "https://contoso.sharepoint.com/sites/legal/contrato.pdf",
                    "lastModifiedDateTime": "2026-01-15T10:00:00Z",
                    "parentReference": { "path": "/drives/drive-1/root:" },
                    "file": { "mimeType": "application/pdf" }
                },
                { "id": "folder-001", "name": "Contratos", "folder": { "childCount": 3 } }
            ],
            "@odata.deltaLink": format!("{}/drives/drive-1/root/delta?token=t1", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let link = library.initial_delta_link("drive-1", None);
    let page = library
        .fetch_page(&link, &CancellationToken::new())
        .await
        .expect("fetch page");

    assert_eq!(page.items.len(), 2);
    assert!(page.next_link.is_none());
    assert_eq!(
        page.delta_link,
        Some(format!("{}/drives/drive-1/root/delta?token=t1", server.uri()))
    );
    assert_eq!(page.eligible_items().count(), 1);
    assert_eq!(page.items[0].parent_path.as_deref(), Some("/drives/drive-1/root:"));
}

#[tokio::test]
async fn test_initial_page_scoped_to_folder() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root:/Contratos/2024:/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [],
            "@odata.deltaLink": "https://example/delta"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let link = library.initial_delta_link("drive-1", Some("/Contratos/2024/"));
    let page = library
        .fetch_page(&link, &CancellationToken::new())
        .await
        .expect("fetch page");
    assert_eq!(page.delta_link.as_deref(), Some("https://example/delta"));
}

#[tokio::test]
async fn test_follow_next_link_to_delta_link() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [ { "id": "file-002", "name": "b.docx", "file": {} } ],
            "@odata.deltaLink": format!("{}/drives/drive-1/root/delta?token=final", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [ { "id": "file-001", "name": "a.docx", "file": {} } ],
            "@odata.nextLink": format!("{}/drives/drive-1/root/delta?$skiptoken=page2", server.uri())
        })))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let first = library
        .fetch_page(&library.initial_delta_link("drive-1", None), &cancel)
        .await
        .unwrap();
    assert_eq!(first.items[0].id, "file-001");
    assert!(first.delta_link.is_none());

    let next = first.next_link.expect("next link");
    let second = library.fetch_page(&next, &cancel).await.unwrap();
    assert_eq!(second.items[0].id, "file-002");
    assert!(second.next_link.is_none());
    assert!(second.delta_link.unwrap().ends_with("token=final"));
}

#[tokio::test]
async fn test_expired_delta_link_is_cursor_expired() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .and(query_param("token", "stale"))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({
            "error": { "code": "resyncRequired", "message": "Resync required" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let link = format!("{}/drives/drive-1/root/delta?token=stale", server.uri());
    let err = library
        .fetch_page(&link, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::CursorExpired(_)));
}

#[tokio::test]
async fn test_non_object_page_is_remote_error() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "a", "page"])))
        .mount(&server)
        .await;

    let err = library
        .fetch_page(&library.initial_delta_link("drive-1", None), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Remote(_)));
}
