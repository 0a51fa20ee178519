use bytes::Bytes;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;

use gazette::application::storage::{ObjectStore, StorageError};
use gazette::infra::storage::{GcsOptions, GcsStore};

fn store(server: &MockServer, token: Option<&str>) -> GcsStore {
    let base = Url::parse(&server.base_url()).expect("mock url");
    GcsStore::new(GcsOptions {
        bucket: "reports-bucket".to_string(),
        endpoint: base.clone(),
        token: token.map(str::to_string),
        metadata_endpoint: base,
    })
    .expect("store")
}

#[tokio::test]
async fn put_uploads_media_with_bearer_token() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload/storage/v1/b/reports-bucket/o")
                .query_param("uploadType", "media")
                .query_param("name", "reports/lakehouse-20240101/index.html")
                .header("authorization", "Bearer static-token")
                .header("content-type", "text/html; charset=utf-8")
                .body("<h1>Lakehouse</h1>");
            then.status(200).json_body(json!({"name": "ok"}));
        })
        .await;

    store(&server, Some("static-token"))
        .put(
            "reports/lakehouse-20240101/index.html",
            Bytes::from_static(b"<h1>Lakehouse</h1>"),
            "text/html; charset=utf-8",
        )
        .await
        .expect("upload should succeed");

    upload.assert_async().await;
}

#[tokio::test]
async fn put_surfaces_remote_failures() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/upload/storage/v1/b/reports-bucket/o");
            then.status(403).body("forbidden");
        })
        .await;

    let err = store(&server, Some("static-token"))
        .put("index.html", Bytes::from_static(b"x"), "text/html")
        .await
        .expect_err("403 should fail");

    match err {
        StorageError::Remote { message } => {
            assert!(message.contains("403"));
            assert!(message.contains("forbidden"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn get_downloads_media_and_maps_missing_objects() {
    let server = MockServer::start_async().await;
    let found = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/storage/v1/b/reports-bucket/o/index.html")
                .query_param("alt", "media");
            then.status(200).body("<html>archive</html>");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/storage/v1/b/reports-bucket/o/missing.json");
            then.status(404).body("not found");
        })
        .await;

    let store = store(&server, Some("static-token"));
    let body = store.get("index.html").await.expect("get should succeed");
    assert_eq!(body, Bytes::from_static(b"<html>archive</html>"));
    found.assert_async().await;

    let err = store.get("missing.json").await.expect_err("404");
    assert!(matches!(err, StorageError::NotFound { ref key } if key == "missing.json"));
}

#[tokio::test]
async fn list_follows_page_tokens() {
    let server = MockServer::start_async().await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/storage/v1/b/reports-bucket/o")
                .query_param("prefix", "reports/")
                .query_param("pageToken", "page-2");
            then.status(200).json_body(json!({
                "items": [{"name": "reports/a-20240101/meta.json"}]
            }));
        })
        .await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/storage/v1/b/reports-bucket/o")
                .query_param("prefix", "reports/")
                .query_param_missing("pageToken");
            then.status(200).json_body(json!({
                "items": [
                    {"name": "reports/c-20240301/meta.json"},
                    {"name": "reports/b-20240201/index.html"}
                ],
                "nextPageToken": "page-2"
            }));
        })
        .await;

    let keys = store(&server, Some("static-token"))
        .list("reports/")
        .await
        .expect("list should succeed");

    assert_eq!(
        keys,
        [
            "reports/a-20240101/meta.json",
            "reports/b-20240201/index.html",
            "reports/c-20240301/meta.json",
        ]
    );
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn metadata_token_is_fetched_once_and_cached() {
    let server = MockServer::start_async().await;
    let token = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/computeMetadata/v1/instance/service-accounts/default/token")
                .header("Metadata-Flavor", "Google");
            then.status(200).json_body(json!({
                "access_token": "metadata-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            }));
        })
        .await;
    let objects = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/storage/v1/b/reports-bucket/o/index.html")
                .header("authorization", "Bearer metadata-token");
            then.status(200).body("ok");
        })
        .await;

    let store = store(&server, None);
    store.get("index.html").await.expect("first get");
    store.get("index.html").await.expect("second get");

    token.assert_calls_async(1).await;
    objects.assert_calls_async(2).await;
}
