//! Request bodies for the JSON endpoints.

use serde::Deserialize;

use stashbox_core::types::FolderId;

/// Body of `POST /api/folders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
}

/// Body of `PATCH /api/folders/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameFolderRequest {
    pub name: String,
}

/// Body of `POST /api/folders/{id}/move`. A `null` (or missing) parent
/// moves the folder to the root level.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveFolderRequest {
    #[serde(default)]
    pub new_parent_id: Option<FolderId>,
}

/// Body of `POST /api/files/{id}/move` and `/copy`.
#[derive(Debug, Clone, Deserialize)]
pub struct FileTargetRequest {
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}
