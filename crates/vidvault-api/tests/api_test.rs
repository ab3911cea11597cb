//! HTTP-level exercises of the video API against in-memory destinations.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use vidvault_api::routes::build_router;
use vidvault_api::state::AppState;
use vidvault_archive::{ArchiveSettings, RetryPolicy, VideoArchive};
use vidvault_core::{BackendKind, Config};
use vidvault_db::MemoryManifestStore;
use vidvault_storage::MemoryBlobStore;

const BOUNDARY: &str = "vidvault-test-boundary";

fn test_config() -> Config {
    Config {
        server_port: 0,
        cors_origins: vec![],
        environment: "test".to_string(),
        data_dir: ".".to_string(),
        storage_backend: BackendKind::Local,
        local_storage_path: None,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        object_size_ceiling: 1024,
        backup_storage_paths: vec![],
        max_upload_size_bytes: 1024 * 1024,
        upload_retry_max_attempts: 3,
        upload_retry_base_delay_ms: 0,
        replication_workers: 2,
        replication_queue_depth: 16,
    }
}

fn test_router(object_size_ceiling: u64) -> Router {
    let primary = Arc::new(MemoryBlobStore::new("primary", object_size_ceiling));
    let manifests = Arc::new(MemoryManifestStore::new());
    let archive = Arc::new(VideoArchive::new(
        primary,
        vec![],
        manifests,
        ArchiveSettings {
            retry: RetryPolicy::new(3, Duration::ZERO),
            replication_workers: 1,
            replication_queue_depth: 4,
        },
    ));
    let state = Arc::new(AppState {
        archive,
        max_upload_size: 1024 * 1024,
    });
    build_router(state, &test_config()).unwrap()
}

fn multipart_upload(filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/v0/videos")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn upload(router: &Router, filename: &str, data: &[u8]) -> serde_json::Value {
    let response = router
        .clone()
        .oneshot(multipart_upload(filename, data))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn health_endpoint_responds() {
    let router = test_router(1024);
    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn upload_then_stream_round_trips() {
    let router = test_router(1024);
    let data = patterned(100);

    let manifest = upload(&router, "clip.mp4", &data).await;
    assert_eq!(manifest["state"], "available");
    assert_eq!(manifest["content_type"], "video/mp4");
    assert_eq!(manifest["total_size"], 100);
    let id = manifest["video_id"].as_str().unwrap().to_string();

    let response = router
        .oneshot(
            Request::get(format!("/api/v0/videos/{id}/stream"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCEPT_RANGES].to_str().unwrap(),
        "bytes"
    );
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "video/mp4"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], &data[..]);
}

#[tokio::test]
async fn range_request_answers_partial_content() {
    let router = test_router(1024);
    let data = patterned(100);
    let manifest = upload(&router, "clip.mp4", &data).await;
    let id = manifest["video_id"].as_str().unwrap().to_string();

    let response = router
        .oneshot(
            Request::get(format!("/api/v0/videos/{id}/stream"))
                .header(header::RANGE, "bytes=10-19")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE].to_str().unwrap(),
        "bytes 10-19/100"
    );
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH].to_str().unwrap(),
        "10"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], &data[10..20]);
}

#[tokio::test]
async fn unsatisfiable_range_is_416() {
    let router = test_router(1024);
    let manifest = upload(&router, "clip.mp4", &patterned(100)).await;
    let id = manifest["video_id"].as_str().unwrap().to_string();

    let response = router
        .oneshot(
            Request::get(format!("/api/v0/videos/{id}/stream"))
                .header(header::RANGE, "bytes=500-")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE].to_str().unwrap(),
        "bytes */100"
    );
}

#[tokio::test]
async fn chunked_video_ignores_range_and_streams_fully() {
    // 120 bytes against a 50-byte ceiling stores three chunks.
    let router = test_router(50);
    let data = patterned(120);
    let manifest = upload(&router, "clip.mp4", &data).await;
    assert_eq!(manifest["placement"]["mode"], "chunked");
    let id = manifest["video_id"].as_str().unwrap().to_string();

    let response = router
        .oneshot(
            Request::get(format!("/api/v0/videos/{id}/stream"))
                .header(header::RANGE, "bytes=0-9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCEPT_RANGES].to_str().unwrap(),
        "none"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], &data[..]);
}

#[tokio::test]
async fn unknown_video_is_404() {
    let router = test_router(1024);
    let response = router
        .oneshot(
            Request::get(format!("/api/v0/videos/{}/stream", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "not_found");
}

#[tokio::test]
async fn unsupported_format_is_rejected() {
    let router = test_router(1024);
    let response = router
        .clone()
        .oneshot(multipart_upload("malware.exe", b"MZ"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_request");
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let router = test_router(1024);
    let response = router
        .clone()
        .oneshot(multipart_upload("clip.mp4", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_and_delete_videos() {
    let router = test_router(1024);
    let manifest = upload(&router, "clip.mp4", &patterned(10)).await;
    let id = manifest["video_id"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(Request::get("/api/v0/videos").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);

    let response = router
        .clone()
        .oneshot(
            Request::delete(format!("/api/v0/videos/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(
            Request::get(format!("/api/v0/videos/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn video_health_reports_redundancy() {
    let router = test_router(1024);
    let manifest = upload(&router, "clip.mp4", &patterned(10)).await;
    let id = manifest["video_id"].as_str().unwrap().to_string();

    let response = router
        .oneshot(
            Request::get(format!("/api/v0/videos/{id}/health"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["redundancy"], 1);
    assert_eq!(report["destinations"][0]["role"], "primary");
    assert_eq!(report["destinations"][0]["status"], "reachable");
}
