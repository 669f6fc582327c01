//! Folder endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use stashbox_core::types::FolderId;
use stashbox_entity::folder::Folder;
use stashbox_service::FolderContents;

use crate::dto::{CreateFolderRequest, MoveFolderRequest, RenameFolderRequest};
use crate::error::ApiError;
use crate::extractors::{Owner, PaginationParams};
use crate::state::AppState;

/// POST /api/folders
pub async fn create_folder(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<Folder>), ApiError> {
    let folder = state
        .folder_service
        .create_folder(owner, &req.name, req.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// PATCH /api/folders/{id}
pub async fn rename_folder(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<FolderId>,
    Json(req): Json<RenameFolderRequest>,
) -> Result<Json<Folder>, ApiError> {
    let folder = state
        .folder_service
        .rename_folder(owner, id, &req.name)
        .await?;
    Ok(Json(folder))
}

/// POST /api/folders/{id}/move
pub async fn move_folder(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<FolderId>,
    Json(req): Json<MoveFolderRequest>,
) -> Result<Json<Folder>, ApiError> {
    let folder = state
        .folder_service
        .move_folder(owner, id, req.new_parent_id)
        .await?;
    Ok(Json(folder))
}

/// DELETE /api/folders/{id}
pub async fn delete_folder(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<FolderId>,
) -> Result<StatusCode, ApiError> {
    state.folder_service.delete_folder(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query string of the contents listing.
///
/// Pagination fields are inlined rather than flattened: `serde(flatten)`
/// forces query values through a string-only buffer and numeric fields
/// stop deserializing.
#[derive(Debug, Deserialize)]
pub struct ContentsQuery {
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// GET /api/folders/contents?folder_id=&page=&page_size=
pub async fn list_contents(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(query): Query<ContentsQuery>,
) -> Result<Json<FolderContents>, ApiError> {
    let page = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    }
    .into_page_request();
    let contents = state
        .folder_service
        .list_contents(owner, query.folder_id, &page)
        .await?;
    Ok(Json(contents))
}
