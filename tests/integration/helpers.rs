//! Shared test helpers for integration tests.
//!
//! Tests run against the real router over the in-memory metadata store
//! and a tempdir-backed blob store. Placement tasks are not executed by
//! background workers; tests drain them deterministically via
//! [`TestApp::drain_placements`].

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use stashbox_api::{build_router, AppState};
use stashbox_core::config::AppConfig;
use stashbox_core::tasks::{TaskQueue, TaskReceiver};
use stashbox_core::traits::blob::BlobStore;
use stashbox_database::{MemoryMetadataStore, MetadataStore};
use stashbox_service::{FileService, FolderService};
use stashbox_storage::LocalBlobStore;
use stashbox_worker::PlacementExecutor;

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Test application context.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn MetadataStore>,
    pub blobs: Arc<dyn BlobStore>,
    executor: PlacementExecutor,
    receiver: tokio::sync::Mutex<TaskReceiver>,
    _blob_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let blob_dir = tempfile::tempdir().expect("Failed to create blob tempdir");
        let blobs: Arc<dyn BlobStore> = Arc::new(
            LocalBlobStore::new(blob_dir.path().to_str().unwrap())
                .await
                .expect("Failed to init blob store"),
        );
        let store: Arc<dyn MetadataStore> = Arc::new(MemoryMetadataStore::new());
        let (queue, receiver) = TaskQueue::bounded(64);

        let folder_service = FolderService::new(Arc::clone(&store));
        let file_service = FileService::new(Arc::clone(&store), Arc::clone(&blobs), queue);
        let state = AppState::new(
            Arc::new(AppConfig::default()),
            folder_service,
            file_service,
        );

        Self {
            router: build_router(state),
            executor: PlacementExecutor::new(Arc::clone(&store), Arc::clone(&blobs)),
            store,
            blobs,
            receiver: tokio::sync::Mutex::new(receiver),
            _blob_dir: blob_dir,
        }
    }

    /// Execute every dispatched placement task, in dispatch order.
    pub async fn drain_placements(&self) {
        let mut rx = self.receiver.lock().await;
        while let Ok(task) = rx.try_recv() {
            self.executor.execute(task).await;
        }
    }

    /// Send a request and parse the JSON body (Null when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Body was not JSON")
        };
        (status, json)
    }

    /// Send a request and return the raw response.
    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        (status, headers, bytes)
    }

    pub async fn get(&self, owner: i64, uri: &str) -> (StatusCode, Value) {
        self.send(request(owner, "GET", uri, Body::empty(), None))
            .await
    }

    pub async fn post_json(&self, owner: i64, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(request(
            owner,
            "POST",
            uri,
            Body::from(body.to_string()),
            Some("application/json"),
        ))
        .await
    }

    pub async fn patch_json(&self, owner: i64, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(request(
            owner,
            "PATCH",
            uri,
            Body::from(body.to_string()),
            Some("application/json"),
        ))
        .await
    }

    pub async fn delete(&self, owner: i64, uri: &str) -> (StatusCode, Value) {
        self.send(request(owner, "DELETE", uri, Body::empty(), None))
            .await
    }

    /// Upload a file via the multipart endpoint.
    pub async fn upload(
        &self,
        owner: i64,
        folder_id: Option<i64>,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let uri = match folder_id {
            Some(id) => format!("/api/files?folder_id={id}"),
            None => "/api/files".to_string(),
        };
        let body = multipart_body(filename, content_type, data);
        self.send(request(
            owner,
            "POST",
            &uri,
            Body::from(body),
            Some(&format!("multipart/form-data; boundary={BOUNDARY}")),
        ))
        .await
    }

    /// Upload, run placement, and return the completed metadata.
    pub async fn upload_completed(
        &self,
        owner: i64,
        folder_id: Option<i64>,
        filename: &str,
        data: &[u8],
    ) -> Value {
        let (status, file) = self
            .upload(owner, folder_id, filename, "application/octet-stream", data)
            .await;
        assert_eq!(status, StatusCode::ACCEPTED, "upload failed: {file}");
        self.drain_placements().await;
        let (status, file) = self
            .get(owner, &format!("/api/files/{}", file["id"].as_i64().unwrap()))
            .await;
        assert_eq!(status, StatusCode::OK);
        file
    }

    /// Create a folder and return its metadata.
    pub async fn create_folder(&self, owner: i64, name: &str, parent_id: Option<i64>) -> Value {
        let body = match parent_id {
            Some(id) => serde_json::json!({ "name": name, "parent_id": id }),
            None => serde_json::json!({ "name": name }),
        };
        let (status, folder) = self.post_json(owner, "/api/folders", body).await;
        assert_eq!(status, StatusCode::CREATED, "folder create failed: {folder}");
        folder
    }
}

/// Build a request with the owner identity header.
pub fn request(
    owner: i64,
    method: &str,
    uri: &str,
    body: Body,
    content_type: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Owner-Id", owner.to_string());
    if let Some(ct) = content_type {
        builder = builder.header("Content-Type", ct);
    }
    builder.body(body).expect("Failed to build request")
}

/// Build a single-field `multipart/form-data` body.
pub fn multipart_body(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
