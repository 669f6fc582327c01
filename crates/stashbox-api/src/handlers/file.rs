//! File endpoints: multipart upload, metadata, download, move, copy,
//! delete.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;

use stashbox_core::error::AppError;
use stashbox_core::types::{FileId, FolderId};
use stashbox_entity::file::File;

use crate::dto::FileTargetRequest;
use crate::error::ApiError;
use crate::extractors::Owner;
use crate::state::AppState;

/// Query string of the upload endpoint.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

/// POST /api/files?folder_id=
///
/// Accepts one multipart `file` field and answers `202 Accepted` with
/// the `Pending` metadata: the bytes are placed asynchronously.
pub async fn upload_file(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<File>), ApiError> {
    let mut upload: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("Multipart file field has no filename"))?;
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?;
        upload = Some((name, content_type, data));
        break;
    }

    let (name, content_type, data) =
        upload.ok_or_else(|| AppError::validation("Missing multipart field: file"))?;

    let file = state
        .file_service
        .upload(owner, query.folder_id, data, &name, content_type.as_deref())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(file)))
}

/// GET /api/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<FileId>,
) -> Result<Json<File>, ApiError> {
    let file = state.file_service.get_metadata(owner, id).await?;
    Ok(Json(file))
}

/// GET /api/files/{id}/download
pub async fn download_file(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<FileId>,
) -> Result<Response, ApiError> {
    let download = state.file_service.get_for_download(owner, id).await?;

    let content_type = download
        .file
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream")
        .to_string();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&download.file.original_name),
        )
        .header(header::CONTENT_LENGTH, download.data.len())
        .body(Body::from(download.data))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;
    Ok(response)
}

/// POST /api/files/{id}/move
pub async fn move_file(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<FileId>,
    Json(req): Json<FileTargetRequest>,
) -> Result<Json<File>, ApiError> {
    let file = state.file_service.move_file(owner, id, req.folder_id).await?;
    Ok(Json(file))
}

/// POST /api/files/{id}/copy
pub async fn copy_file(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<FileId>,
    Json(req): Json<FileTargetRequest>,
) -> Result<(StatusCode, Json<File>), ApiError> {
    let file = state.file_service.copy_file(owner, id, req.folder_id).await?;
    Ok((StatusCode::ACCEPTED, Json(file)))
}

/// DELETE /api/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<FileId>,
) -> Result<StatusCode, ApiError> {
    state.file_service.delete_file(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build an attachment `Content-Disposition` value with both the plain
/// `filename` fallback and the RFC 5987 `filename*` form for non-ASCII
/// names.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c.is_ascii() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_ascii() && !name.contains('"') && !name.contains('\\') {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            percent_encode(name)
        )
    }
}

/// Percent-encode everything outside RFC 5987 `attr-char`.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'!' | b'#' | b'$' | b'&' | b'+'
            | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
