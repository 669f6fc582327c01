//! Folder tree operations over the materialized-path index.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use stashbox_core::error::AppError;
use stashbox_core::result::AppResult;
use stashbox_core::types::{FolderId, OwnerId, PageRequest};
use stashbox_database::{MetadataStore, MetadataTx};
use stashbox_entity::file::File;
use stashbox_entity::folder::{path, CreateFolder, Folder};

/// Longest accepted folder name, in characters.
const MAX_FOLDER_NAME_LEN: usize = 255;

/// One page of a folder listing: immediate live child folders plus live,
/// fully placed files.
#[derive(Debug, Clone, Serialize)]
pub struct FolderContents {
    pub folders: Vec<Folder>,
    pub files: Vec<File>,
}

/// Manages the folder tree for all tenants.
#[derive(Debug, Clone)]
pub struct FolderService {
    store: Arc<dyn MetadataStore>,
}

impl FolderService {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Create a folder under `parent_id` (or at the root when `None`).
    ///
    /// The row is inserted first to obtain its id, then the materialized
    /// path is computed from the parent's path and persisted, all in one
    /// transaction.
    pub async fn create_folder(
        &self,
        owner: OwnerId,
        name: &str,
        parent_id: Option<FolderId>,
    ) -> AppResult<Folder> {
        let name = validate_folder_name(name)?;

        let mut tx = self.store.begin().await?;

        let parent = match parent_id {
            Some(pid) => Some(
                tx.find_folder(owner, pid)
                    .await?
                    .ok_or_else(|| AppError::not_found("Parent folder not found"))?,
            ),
            None => None,
        };

        if tx.folder_name_exists(owner, parent_id, name).await? {
            return Err(AppError::conflict(
                "A folder with this name already exists here",
            ));
        }

        let mut folder = tx
            .insert_folder(&CreateFolder {
                owner_id: owner,
                name: name.to_string(),
                parent_id,
            })
            .await?;

        let folder_path = match &parent {
            Some(p) => path::child_path(&p.path, folder.id),
            None => path::root_path(owner, folder.id),
        };
        tx.set_folder_path(folder.id, &folder_path).await?;
        folder.path = folder_path;

        tx.commit().await?;
        info!(%owner, folder_id = %folder.id, path = %folder.path, "Created folder");
        Ok(folder)
    }

    /// Rename a folder. Paths encode ids, not names, so no path changes.
    pub async fn rename_folder(
        &self,
        owner: OwnerId,
        id: FolderId,
        new_name: &str,
    ) -> AppResult<Folder> {
        let new_name = validate_folder_name(new_name)?;

        let mut tx = self.store.begin().await?;
        let mut folder = tx
            .lock_folder(owner, id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))?;

        if folder.name == new_name {
            tx.rollback().await?;
            return Ok(folder);
        }
        if tx
            .folder_name_exists(owner, folder.parent_id, new_name)
            .await?
        {
            return Err(AppError::conflict(
                "A folder with this name already exists here",
            ));
        }

        tx.update_folder_name(id, new_name).await?;
        tx.commit().await?;

        folder.name = new_name.to_string();
        info!(%owner, folder_id = %id, "Renamed folder");
        Ok(folder)
    }

    /// Move a folder (and its whole subtree) under a new parent.
    ///
    /// The two rows involved are locked in ascending-id order regardless
    /// of which is the folder and which is the destination, so two
    /// concurrent moves touching the same pair cannot deadlock. The
    /// subtree's paths and the denormalized paths of files inside it are
    /// each rewritten by a single bulk statement.
    pub async fn move_folder(
        &self,
        owner: OwnerId,
        id: FolderId,
        new_parent_id: Option<FolderId>,
    ) -> AppResult<Folder> {
        if new_parent_id == Some(id) {
            return Err(AppError::invalid_operation(
                "Cannot move a folder into itself",
            ));
        }

        let mut tx = self.store.begin().await?;

        let (mut folder, new_parent) = match new_parent_id {
            None => {
                let folder = tx
                    .lock_folder(owner, id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Folder not found"))?;
                (folder, None)
            }
            Some(pid) => {
                let (folder, parent) = if pid < id {
                    let parent = tx.lock_folder(owner, pid).await?;
                    let folder = tx.lock_folder(owner, id).await?;
                    (folder, parent)
                } else {
                    let folder = tx.lock_folder(owner, id).await?;
                    let parent = tx.lock_folder(owner, pid).await?;
                    (folder, parent)
                };
                let folder = folder.ok_or_else(|| AppError::not_found("Folder not found"))?;
                let parent = parent
                    .ok_or_else(|| AppError::not_found("Destination folder not found"))?;
                (folder, Some(parent))
            }
        };

        if let Some(parent) = &new_parent {
            // The destination's path is read from its locked snapshot, so
            // a concurrent move cannot slip the destination under us.
            if path::is_under(&parent.path, &folder.path) {
                return Err(AppError::invalid_operation(
                    "Cannot move a folder into its own subtree",
                ));
            }
        }

        if folder.parent_id == new_parent_id {
            tx.rollback().await?;
            return Ok(folder);
        }

        if tx
            .folder_name_exists(owner, new_parent_id, &folder.name)
            .await?
        {
            return Err(AppError::conflict(
                "A folder with this name already exists at the destination",
            ));
        }

        let new_path = match &new_parent {
            Some(p) => path::child_path(&p.path, folder.id),
            None => path::root_path(owner, folder.id),
        };

        tx.set_folder_parent(id, new_parent_id).await?;
        let folders_rewritten = tx
            .rewrite_folder_paths(owner, &folder.path, &new_path)
            .await?;
        let files_rewritten = tx
            .rewrite_file_folder_paths(owner, &folder.path, &new_path)
            .await?;
        tx.commit().await?;

        info!(
            %owner,
            folder_id = %id,
            old_path = %folder.path,
            new_path = %new_path,
            folders_rewritten,
            files_rewritten,
            "Moved folder"
        );
        folder.parent_id = new_parent_id;
        folder.path = new_path;
        Ok(folder)
    }

    /// Soft-delete a folder and everything under it.
    ///
    /// Folders and files under the path are each swept by one bulk
    /// statement, all stamped with the same `deleted_at`, so the cascade
    /// is atomic: no reader ever sees a live child of a deleted folder.
    pub async fn delete_folder(&self, owner: OwnerId, id: FolderId) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let folder = tx
            .lock_folder(owner, id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))?;

        let deleted_at = Utc::now();
        let folders = tx
            .soft_delete_folders_under(owner, &folder.path, deleted_at)
            .await?;
        let files = tx
            .soft_delete_files_under(owner, &folder.path, deleted_at)
            .await?;
        tx.commit().await?;

        info!(%owner, folder_id = %id, folders, files, "Soft-deleted folder subtree");
        Ok(())
    }

    /// List the immediate contents of a folder (or of the root when
    /// `folder_id` is `None`): live child folders and live `Completed`
    /// files, both name-ordered and paged.
    pub async fn list_contents(
        &self,
        owner: OwnerId,
        folder_id: Option<FolderId>,
        page: &PageRequest,
    ) -> AppResult<FolderContents> {
        let mut tx = self.store.begin().await?;

        if let Some(fid) = folder_id {
            tx.find_folder(owner, fid)
                .await?
                .ok_or_else(|| AppError::not_found("Folder not found"))?;
        }

        let folders = tx.list_child_folders(owner, folder_id, page).await?;
        let files = tx.list_completed_files(owner, folder_id, page).await?;
        tx.rollback().await?;

        Ok(FolderContents { folders, files })
    }
}

/// Validate a display name for a folder.
fn validate_folder_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Folder name cannot be empty"));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation("Invalid folder name"));
    }
    if name.chars().count() > MAX_FOLDER_NAME_LEN {
        return Err(AppError::validation("Folder name is too long"));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(AppError::validation(
            "Folder name cannot contain path separators or control characters",
        ));
    }
    Ok(name)
}
