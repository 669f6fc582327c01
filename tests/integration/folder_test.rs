//! Folder tree behavior through the HTTP surface.

use http::StatusCode;
use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn created_folders_carry_id_based_paths() {
    let app = TestApp::new().await;

    let root = app.create_folder(7, "docs", None).await;
    let root_id = root["id"].as_i64().unwrap();
    assert_eq!(root["path"], format!("u7.f{root_id}"));
    assert_eq!(root["parent_id"], json!(null));

    let child = app.create_folder(7, "tax", Some(root_id)).await;
    let child_id = child["id"].as_i64().unwrap();
    assert_eq!(child["path"], format!("u7.f{root_id}.f{child_id}"));
}

#[tokio::test]
async fn rename_changes_name_but_never_paths() {
    let app = TestApp::new().await;
    let root = app.create_folder(1, "a", None).await;
    let root_id = root["id"].as_i64().unwrap();
    let child = app.create_folder(1, "b", Some(root_id)).await;

    let (status, renamed) = app
        .patch_json(1, &format!("/api/folders/{root_id}"), json!({ "name": "archive" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "archive");
    assert_eq!(renamed["path"], root["path"]);

    let (_, contents) = app
        .get(1, &format!("/api/folders/contents?folder_id={root_id}"))
        .await;
    assert_eq!(contents["folders"][0]["path"], child["path"]);
}

#[tokio::test]
async fn moving_a_root_folder_under_a_sibling_rewrites_its_path() {
    let app = TestApp::new().await;
    // First two folders of this owner get ids 1 and 2.
    let a = app.create_folder(1, "a", None).await;
    let b = app.create_folder(1, "b", None).await;
    assert_eq!(a["path"], "u1.f1");
    assert_eq!(b["path"], "u1.f2");

    let (status, moved) = app
        .post_json(1, "/api/folders/1/move", json!({ "new_parent_id": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["path"], "u1.f2.f1");
    assert_eq!(moved["parent_id"], json!(2));
}

#[tokio::test]
async fn move_rewrites_every_descendant_path() {
    let app = TestApp::new().await;
    let a = app.create_folder(3, "a", None).await;
    let a_id = a["id"].as_i64().unwrap();
    let b = app.create_folder(3, "b", Some(a_id)).await;
    let b_id = b["id"].as_i64().unwrap();
    let c = app.create_folder(3, "c", Some(b_id)).await;
    let c_id = c["id"].as_i64().unwrap();
    let dest = app.create_folder(3, "dest", None).await;
    let dest_id = dest["id"].as_i64().unwrap();

    let (status, moved) = app
        .post_json(
            3,
            &format!("/api/folders/{b_id}/move"),
            json!({ "new_parent_id": dest_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_b_path = format!("{}.f{b_id}", dest["path"].as_str().unwrap());
    assert_eq!(moved["path"], new_b_path);

    let (_, contents) = app
        .get(3, &format!("/api/folders/contents?folder_id={b_id}"))
        .await;
    assert_eq!(contents["folders"][0]["id"], json!(c_id));
    assert_eq!(contents["folders"][0]["path"], format!("{new_b_path}.f{c_id}"));
}

#[tokio::test]
async fn moving_to_root_rewrites_folder_and_file_paths() {
    let app = TestApp::new().await;
    let parent = app.create_folder(5, "parent", None).await;
    let parent_id = parent["id"].as_i64().unwrap();
    let child = app.create_folder(5, "photos", Some(parent_id)).await;
    let child_id = child["id"].as_i64().unwrap();
    assert_eq!(child["path"], format!("u5.f{parent_id}.f{child_id}"));

    let file = app
        .upload_completed(5, Some(child_id), "cat.jpg", b"bytes")
        .await;
    assert_eq!(file["folder_path"], child["path"]);

    let (status, moved) = app
        .post_json(
            5,
            &format!("/api/folders/{child_id}/move"),
            json!({ "new_parent_id": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["path"], format!("u5.f{child_id}"));
    assert_eq!(moved["parent_id"], json!(null));

    // The contained file's denormalized path follows the folder up.
    let (_, file) = app
        .get(5, &format!("/api/files/{}", file["id"].as_i64().unwrap()))
        .await;
    assert_eq!(file["folder_path"], format!("u5.f{child_id}"));
}

#[tokio::test]
async fn moving_into_own_subtree_is_rejected_and_changes_nothing() {
    let app = TestApp::new().await;
    let a = app.create_folder(1, "a", None).await;
    let a_id = a["id"].as_i64().unwrap();
    let b = app.create_folder(1, "b", Some(a_id)).await;
    let b_id = b["id"].as_i64().unwrap();

    for target in [a_id, b_id] {
        let (status, body) = app
            .post_json(
                1,
                &format!("/api/folders/{a_id}/move"),
                json!({ "new_parent_id": target }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_OPERATION");
    }

    let (_, contents) = app
        .get(1, &format!("/api/folders/contents?folder_id={a_id}"))
        .await;
    assert_eq!(contents["folders"][0]["path"], b["path"]);
}

#[tokio::test]
async fn duplicate_sibling_names_conflict() {
    let app = TestApp::new().await;
    app.create_folder(1, "docs", None).await;

    let (status, body) = app
        .post_json(1, "/api/folders", json!({ "name": "docs" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    // Same name is fine under another parent and for another owner.
    let other = app.create_folder(1, "other", None).await;
    app.create_folder(1, "docs", Some(other["id"].as_i64().unwrap()))
        .await;
    app.create_folder(2, "docs", None).await;
}

#[tokio::test]
async fn folder_names_are_validated() {
    let app = TestApp::new().await;
    for bad in ["", " ", ".", "..", "a/b", "a\\b"] {
        let (status, body) = app
            .post_json(1, "/api/folders", json!({ "name": bad }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {bad:?}: {body}");
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn delete_cascades_atomically_over_the_subtree() {
    let app = TestApp::new().await;
    let a = app.create_folder(1, "a", None).await;
    let a_id = a["id"].as_i64().unwrap();
    let b = app.create_folder(1, "b", Some(a_id)).await;
    let b_id = b["id"].as_i64().unwrap();
    app.create_folder(1, "c", Some(b_id)).await;

    let (status, _) = app.delete(1, &format!("/api/folders/{a_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Every folder in the subtree is gone, not just the root.
    for id in [a_id, b_id] {
        let (status, _) = app
            .get(1, &format!("/api/folders/contents?folder_id={id}"))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (_, contents) = app.get(1, "/api/folders/contents").await;
    assert_eq!(contents["folders"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn folders_are_scoped_to_their_owner() {
    let app = TestApp::new().await;
    let folder = app.create_folder(1, "private", None).await;
    let id = folder["id"].as_i64().unwrap();

    let (status, _) = app
        .get(2, &format!("/api/folders/contents?folder_id={id}"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .patch_json(2, &format!("/api/folders/{id}"), json!({ "name": "stolen" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_header_is_required_and_validated() {
    let app = TestApp::new().await;

    let request = http::Request::builder()
        .method("GET")
        .uri("/api/folders/contents")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let request = http::Request::builder()
        .method("GET")
        .uri("/api/folders/contents")
        .header("X-Owner-Id", "not-a-number")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_pages_are_bounded_and_name_ordered() {
    let app = TestApp::new().await;
    for name in ["zebra", "apple", "mango"] {
        app.create_folder(1, name, None).await;
    }

    let (status, contents) = app
        .get(1, "/api/folders/contents?page=1&page_size=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    let folders = contents["folders"].as_array().unwrap();
    assert_eq!(folders.len(), 2);
    assert_eq!(folders[0]["name"], "apple");
    assert_eq!(folders[1]["name"], "mango");

    let (_, contents) = app
        .get(1, "/api/folders/contents?page=2&page_size=2")
        .await;
    let folders = contents["folders"].as_array().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0]["name"], "zebra");
}
