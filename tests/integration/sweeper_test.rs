//! Sweeper passes driven through the full stack with explicit clocks.

use std::sync::Arc;

use chrono::{Duration, Utc};
use http::StatusCode;
use uuid::Uuid;

use stashbox_core::config::SweeperConfig;
use stashbox_core::traits::blob::BlobStore as _;
use stashbox_core::types::{BlobKey, FileId};
use stashbox_database::{MetadataStore as _, MetadataTx as _};
use stashbox_entity::file::UploadStatus;
use stashbox_worker::Sweeper;

use crate::helpers::TestApp;

fn sweeper(app: &TestApp) -> Sweeper {
    Sweeper::new(
        Arc::clone(&app.store),
        Arc::clone(&app.blobs),
        SweeperConfig::default(),
    )
}

async fn flip_status(app: &TestApp, id: i64, status: UploadStatus) {
    let mut tx = app.store.begin().await.unwrap();
    tx.update_upload_status(FileId(id), status).await.unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn recovery_completes_rows_whose_blob_was_placed() {
    let app = TestApp::new().await;
    let sweeper = sweeper(&app);

    // Bytes were placed but the status flip was lost.
    let file = app.upload_completed(1, None, "placed.txt", b"x").await;
    let file_id = file["id"].as_i64().unwrap();
    flip_status(&app, file_id, UploadStatus::Pending).await;

    let (status, _) = app.get(1, &format!("/api/files/{file_id}/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Young rows are left alone.
    assert_eq!(sweeper.recover_stale_uploads(Utc::now()).await.unwrap(), 0);

    let past_t1 = Utc::now() + Duration::hours(2);
    assert_eq!(sweeper.recover_stale_uploads(past_t1).await.unwrap(), 1);

    let (status, seen) = app.get(1, &format!("/api/files/{file_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen["upload_status"], "COMPLETED");
    let (status, _, _) = app
        .send_raw(crate::helpers::request(
            1,
            "GET",
            &format!("/api/files/{file_id}/download"),
            axum::body::Body::empty(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unrecoverable_uploads_are_purged_after_twice_the_threshold() {
    let app = TestApp::new().await;
    let sweeper = sweeper(&app);

    // An upload whose bytes never arrived: pending, no blob under its key.
    let (_, file) = app
        .upload(1, None, "lost.txt", "text/plain", b"never placed")
        .await;
    let file_id = file["id"].as_i64().unwrap();
    let blob_key = BlobKey(Uuid::parse_str(file["blob_key"].as_str().unwrap()).unwrap());

    let past_t1 = Utc::now() + Duration::hours(1) + Duration::minutes(5);
    // Recovery cannot help (no blob), and purge is not allowed yet.
    assert_eq!(sweeper.recover_stale_uploads(past_t1).await.unwrap(), 0);
    assert_eq!(sweeper.purge_stale_uploads(past_t1).await.unwrap(), 0);

    let past_2t1 = Utc::now() + Duration::hours(2) + Duration::minutes(5);
    assert_eq!(sweeper.purge_stale_uploads(past_2t1).await.unwrap(), 1);

    let (status, _) = app.get(1, &format!("/api/files/{file_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!app.blobs.exists(blob_key).await.unwrap());
}

#[tokio::test]
async fn reclamation_removes_soft_deleted_rows_and_their_blobs() {
    let app = TestApp::new().await;
    let sweeper = sweeper(&app);

    let file = app.upload_completed(1, None, "gone.txt", b"bytes").await;
    let file_id = file["id"].as_i64().unwrap();
    let blob_key = BlobKey(Uuid::parse_str(file["blob_key"].as_str().unwrap()).unwrap());

    let (status, _) = app.delete(1, &format!("/api/files/{file_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The blob survives the retention window for recovery purposes.
    assert_eq!(sweeper.reclaim_soft_deleted(Utc::now()).await.unwrap(), 0);
    assert!(app.blobs.exists(blob_key).await.unwrap());

    let past_retention = Utc::now() + Duration::hours(1);
    assert_eq!(
        sweeper.reclaim_soft_deleted(past_retention).await.unwrap(),
        1
    );
    assert!(!app.blobs.exists(blob_key).await.unwrap());
}

#[tokio::test]
async fn reclamation_covers_cascade_deleted_subtrees() {
    let app = TestApp::new().await;
    let sweeper = sweeper(&app);

    let folder = app.create_folder(1, "doomed", None).await;
    let folder_id = folder["id"].as_i64().unwrap();
    let file = app
        .upload_completed(1, Some(folder_id), "inside.txt", b"x")
        .await;
    let blob_key = BlobKey(Uuid::parse_str(file["blob_key"].as_str().unwrap()).unwrap());

    let (status, _) = app.delete(1, &format!("/api/folders/{folder_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let past_retention = Utc::now() + Duration::hours(1);
    // One file row and one folder row reclaimed.
    assert_eq!(
        sweeper.reclaim_soft_deleted(past_retention).await.unwrap(),
        2
    );
    assert!(!app.blobs.exists(blob_key).await.unwrap());
}

#[tokio::test]
async fn a_full_sweep_leaves_healthy_data_alone() {
    let app = TestApp::new().await;
    let sweeper = sweeper(&app);

    let folder = app.create_folder(1, "keep", None).await;
    let folder_id = folder["id"].as_i64().unwrap();
    let file = app
        .upload_completed(1, Some(folder_id), "keep.txt", b"keep")
        .await;
    let file_id = file["id"].as_i64().unwrap();

    sweeper.sweep(Utc::now() + Duration::days(365)).await;

    let (status, seen) = app.get(1, &format!("/api/files/{file_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen["upload_status"], "COMPLETED");
    let (status, _) = app
        .get(1, &format!("/api/folders/contents?folder_id={folder_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
}
