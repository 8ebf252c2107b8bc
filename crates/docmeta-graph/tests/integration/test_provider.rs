//! Integration tests for site/drive resolution, item detail and field updates

use docmeta_core::domain::FieldMap;
use docmeta_core::ports::{IDocumentLibrary, LibraryError};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_resolve_site_id() {
    let (server, library) = common::setup_library().await;
    common::mount_site(&server).await;

    let site_id = library
        .resolve_site_id(
            "https://contoso.sharepoint.com/sites/legal/",
            &CancellationToken::new(),
        )
        .await
        .expect("resolve site");
    assert_eq!(site_id, "site-1");
}

#[tokio::test]
async fn test_resolve_site_malformed_url_is_configuration_error() {
    let (_server, library) = common::setup_library().await;

    let err = library
        .resolve_site_id("sites/legal", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Configuration(_)));
}

#[tokio::test]
async fn test_resolve_site_not_found_is_configuration_error() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = library
        .resolve_site_id("https://contoso.sharepoint.com/sites/nope", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Configuration(msg) if msg.contains("Site not found")));
}

#[tokio::test]
async fn test_resolve_drive_id_case_insensitive() {
    let (server, library) = common::setup_library().await;
    common::mount_drives(&server).await;

    let drive_id = library
        .resolve_drive_id("site-1", "documentos", &CancellationToken::new())
        .await
        .expect("resolve drive");
    assert_eq!(drive_id, "drive-docs");
}

#[tokio::test]
async fn test_resolve_drive_id_not_found() {
    let (server, library) = common::setup_library().await;
    common::mount_drives(&server).await;

    let err = library
        .resolve_drive_id("site-1", "Arquivo Morto", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Configuration(msg) if msg.contains("Arquivo Morto")));
}

#[tokio::test]
async fn test_get_item_detail() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/items/item-1"))
        .and(query_param("$expand", "listItem($expand=fields)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "item-1",
            "name": "contrato.pdf",
            "size": 4096,
            "createdDateTime": "2024-01-01T00:00:00Z",
            "createdBy": { "user": { "displayName": "Joao" } },
            "listItem": {
                "fields": {
                    "@odata.etag": "\"1\"",
                    "Title": "Contrato",
                    "TipoDocumento": ""
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let detail = library
        .get_item_detail("drive-1", "item-1", &CancellationToken::new())
        .await
        .expect("item detail");

    assert_eq!(detail.size, 4096);
    assert_eq!(detail.created_by.as_deref(), Some("Joao"));
    assert_eq!(detail.fields.len(), 2);
    assert_eq!(detail.fields["TipoDocumento"], json!(""));
}

#[tokio::test]
async fn test_get_item_detail_not_found() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = library
        .get_item_detail("drive-1", "missing", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound(_)));
}

#[tokio::test]
async fn test_update_fields_patches_list_item() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("PATCH"))
        .and(path("/drives/drive-1/items/item-1/listItem/fields"))
        .and(body_json(json!({ "TipoDocumento": "Contrato", "TamanhoBytes": 4096 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut fields = FieldMap::new();
    fields.insert("TipoDocumento".into(), json!("Contrato"));
    fields.insert("TamanhoBytes".into(), json!(4096));

    let ok = library
        .update_fields("drive-1", "item-1", &fields, &CancellationToken::new())
        .await
        .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn test_update_fields_rejected_is_false() {
    let (server, library) = common::setup_library().await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let ok = library
        .update_fields("drive-1", "item-1", &FieldMap::new(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn test_update_fields_cancelled_is_error() {
    let (_server, library) = common::setup_library().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = library
        .update_fields("drive-1", "item-1", &FieldMap::new(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Cancelled));
}
