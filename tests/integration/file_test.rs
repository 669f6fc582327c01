//! Upload pipeline and file operations through the HTTP surface.

use http::StatusCode;
use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn upload_is_visible_as_pending_and_downloadable_after_placement() {
    let app = TestApp::new().await;
    let folder = app.create_folder(1, "docs", None).await;
    let folder_id = folder["id"].as_i64().unwrap();

    let (status, file) = app
        .upload(1, Some(folder_id), "report.pdf", "application/pdf", b"%PDF-1.7 body")
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(file["upload_status"], "PENDING");
    assert_eq!(file["original_name"], "report.pdf");
    assert_eq!(file["folder_path"], folder["path"]);
    let file_id = file["id"].as_i64().unwrap();

    // Metadata is readable while pending, bytes are not.
    let (status, seen) = app.get(1, &format!("/api/files/{file_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen["upload_status"], "PENDING");
    let (status, _) = app.get(1, &format!("/api/files/{file_id}/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.drain_placements().await;

    let (_, seen) = app.get(1, &format!("/api/files/{file_id}")).await;
    assert_eq!(seen["upload_status"], "COMPLETED");

    let (status, headers, bytes) = app
        .send_raw(crate::helpers::request(
            1,
            "GET",
            &format!("/api/files/{file_id}/download"),
            axum::body::Body::empty(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&bytes[..], b"%PDF-1.7 body");
    assert_eq!(headers["content-type"], "application/pdf");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"report.pdf\""
    );
}

#[tokio::test]
async fn upload_filename_is_sanitized_and_content_type_resolved() {
    let app = TestApp::new().await;

    let (status, file) = app
        .upload(1, None, "..\\evil\\notes.txt", "application/x-evil", b"plain words")
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(file["original_name"], "notes.txt");
    // Extension table beats the claimed type.
    assert_eq!(file["content_type"], "text/plain");
}

#[tokio::test]
async fn duplicate_filenames_in_a_folder_conflict() {
    let app = TestApp::new().await;
    app.upload_completed(1, None, "a.txt", b"1").await;

    let (status, body) = app.upload(1, None, "a.txt", "text/plain", b"2").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    // Same name for another owner is fine.
    let (status, _) = app.upload(2, None, "a.txt", "text/plain", b"3").await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn moving_a_folder_rewrites_contained_file_paths() {
    let app = TestApp::new().await;
    let a = app.create_folder(1, "a", None).await;
    let a_id = a["id"].as_i64().unwrap();
    let b = app.create_folder(1, "b", Some(a_id)).await;
    let b_id = b["id"].as_i64().unwrap();
    let dest = app.create_folder(1, "dest", None).await;
    let dest_id = dest["id"].as_i64().unwrap();

    let file = app.upload_completed(1, Some(b_id), "deep.txt", b"x").await;
    assert_eq!(file["folder_path"], b["path"]);

    let (status, _) = app
        .post_json(
            1,
            &format!("/api/folders/{a_id}/move"),
            json!({ "new_parent_id": dest_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, seen) = app
        .get(1, &format!("/api/files/{}", file["id"].as_i64().unwrap()))
        .await;
    let expected = format!(
        "{}.f{a_id}.f{b_id}",
        dest["path"].as_str().unwrap()
    );
    assert_eq!(seen["folder_path"], expected);
}

#[tokio::test]
async fn move_file_updates_location_and_checks_destination_duplicates() {
    let app = TestApp::new().await;
    let folder = app.create_folder(1, "docs", None).await;
    let folder_id = folder["id"].as_i64().unwrap();
    let file = app.upload_completed(1, None, "a.txt", b"x").await;
    let file_id = file["id"].as_i64().unwrap();

    let (status, moved) = app
        .post_json(
            1,
            &format!("/api/files/{file_id}/move"),
            json!({ "folder_id": folder_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["folder_id"], json!(folder_id));
    assert_eq!(moved["folder_path"], folder["path"]);

    // A same-named file already at the destination blocks the move.
    app.upload_completed(1, None, "b.txt", b"y").await;
    app.upload_completed(1, Some(folder_id), "b.txt", b"z").await;
    let (_, listing) = app.get(1, "/api/folders/contents").await;
    let blocker = listing["files"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["original_name"] == "b.txt")
        .unwrap();
    let (status, body) = app
        .post_json(
            1,
            &format!("/api/files/{}/move", blocker["id"].as_i64().unwrap()),
            json!({ "folder_id": folder_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn copy_goes_through_the_pending_pipeline() {
    let app = TestApp::new().await;
    let folder = app.create_folder(1, "dest", None).await;
    let folder_id = folder["id"].as_i64().unwrap();
    let file = app.upload_completed(1, None, "orig.bin", b"payload").await;
    let file_id = file["id"].as_i64().unwrap();

    let (status, copy) = app
        .post_json(
            1,
            &format!("/api/files/{file_id}/copy"),
            json!({ "folder_id": folder_id }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(copy["upload_status"], "PENDING");
    assert_ne!(copy["blob_key"], file["blob_key"]);
    let copy_id = copy["id"].as_i64().unwrap();

    app.drain_placements().await;

    let (status, _, bytes) = app
        .send_raw(crate::helpers::request(
            1,
            "GET",
            &format!("/api/files/{copy_id}/download"),
            axum::body::Body::empty(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&bytes[..], b"payload");

    // The source is untouched.
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
async fn pending_files_cannot_be_copied() {
    let app = TestApp::new().await;
    let (_, file) = app.upload(1, None, "a.bin", "application/octet-stream", b"x").await;
    let file_id = file["id"].as_i64().unwrap();

    let (status, _) = app
        .post_json(1, &format!("/api/files/{file_id}/copy"), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_files_disappear_from_reads_and_listings() {
    let app = TestApp::new().await;
    let file = app.upload_completed(1, None, "a.txt", b"x").await;
    let file_id = file["id"].as_i64().unwrap();

    let (status, _) = app.delete(1, &format!("/api/files/{file_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(1, &format!("/api/files/{file_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, contents) = app.get(1, "/api/folders/contents").await;
    assert_eq!(contents["files"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn files_are_scoped_to_their_owner() {
    let app = TestApp::new().await;
    let file = app.upload_completed(1, None, "secret.txt", b"x").await;
    let file_id = file["id"].as_i64().unwrap();

    for uri in [
        format!("/api/files/{file_id}"),
        format!("/api/files/{file_id}/download"),
    ] {
        let (status, _) = app.get(2, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, _) = app.delete(2, &format!("/api/files/{file_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listings_show_only_completed_files() {
    let app = TestApp::new().await;
    app.upload_completed(1, None, "done.txt", b"x").await;
    let (status, _) = app
        .upload(1, None, "pending.txt", "text/plain", b"y")
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, contents) = app.get(1, "/api/folders/contents").await;
    let files = contents["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["original_name"], "done.txt");
}
