//! File operations: the staged upload pipeline, downloads, move, copy
//! and soft delete.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use stashbox_core::error::AppError;
use stashbox_core::result::AppResult;
use stashbox_core::tasks::{PlacementTask, TaskQueue};
use stashbox_core::traits::blob::BlobStore;
use stashbox_core::types::{BlobKey, FileId, FolderId, OwnerId};
use stashbox_database::{MetadataStore, MetadataTx};
use stashbox_entity::file::{CreateFile, File, UploadStatus};

use super::naming;

/// A file's bytes together with the metadata a download response needs.
#[derive(Debug)]
pub struct FileDownload {
    pub file: File,
    pub data: Bytes,
}

/// Manages file metadata and the upload pipeline.
///
/// Uploads are write-ahead: the `Pending` metadata row commits before any
/// bytes reach their final location, and an after-commit hook dispatches
/// the placement task. A client can therefore see its file as `Pending`
/// the moment the upload request returns.
#[derive(Debug, Clone)]
pub struct FileService {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    queue: TaskQueue,
}

impl FileService {
    pub fn new(store: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>, queue: TaskQueue) -> Self {
        Self {
            store,
            blobs,
            queue,
        }
    }

    /// Accept an upload: commit a `Pending` row, stage the bytes, and
    /// dispatch async placement after the commit.
    ///
    /// If staging fails the row is flipped to `Failed` and committed
    /// anyway, so the failure is observable, then the storage error is
    /// returned.
    pub async fn upload(
        &self,
        owner: OwnerId,
        folder_id: Option<FolderId>,
        data: Bytes,
        claimed_name: &str,
        claimed_content_type: Option<&str>,
    ) -> AppResult<File> {
        let name = naming::sanitize_filename(claimed_name)?;
        let content_type = naming::resolve_content_type(&data, &name, claimed_content_type);

        let mut tx = self.store.begin().await?;

        let folder_path = match folder_id {
            Some(fid) => Some(
                tx.find_folder(owner, fid)
                    .await?
                    .ok_or_else(|| AppError::not_found("Folder not found"))?
                    .path,
            ),
            None => None,
        };

        if tx.file_name_exists(owner, folder_id, &name).await? {
            return Err(AppError::conflict(
                "A file with this name already exists here",
            ));
        }

        let key = BlobKey::generate();
        let file = tx
            .insert_file(&CreateFile {
                owner_id: owner,
                original_name: name,
                blob_key: key,
                folder_id,
                folder_path,
                size_bytes: data.len() as i64,
                content_type: Some(content_type),
                upload_status: UploadStatus::Pending,
            })
            .await?;

        match self.blobs.stage(data).await {
            Ok(staged) => {
                let queue = self.queue.clone();
                let task = PlacementTask::Place {
                    file_id: file.id,
                    staged,
                    key,
                };
                tx.after_commit(Box::new(move || queue.dispatch(task)));
            }
            Err(e) => {
                tx.update_upload_status(file.id, UploadStatus::Failed)
                    .await?;
                tx.commit().await?;
                return Err(e);
            }
        }

        tx.commit().await?;
        info!(%owner, file_id = %file.id, name = %file.original_name, "Accepted upload");
        Ok(file)
    }

    /// Fetch a file's metadata.
    pub async fn get_metadata(&self, owner: OwnerId, id: FileId) -> AppResult<File> {
        let mut tx = self.store.begin().await?;
        let file = tx
            .find_file(owner, id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        tx.rollback().await?;
        Ok(file)
    }

    /// Fetch a file's bytes for download.
    ///
    /// A file that is not yet (or never was) fully placed does not exist
    /// as far as downloads are concerned.
    pub async fn get_for_download(&self, owner: OwnerId, id: FileId) -> AppResult<FileDownload> {
        let file = self.get_metadata(owner, id).await?;
        if file.upload_status != UploadStatus::Completed {
            return Err(AppError::not_found("File not found"));
        }
        let data = self.blobs.read_bytes(file.blob_key).await?;
        Ok(FileDownload { file, data })
    }

    /// Soft-delete a file. Its bytes are reclaimed later by the sweeper.
    pub async fn delete_file(&self, owner: OwnerId, id: FileId) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        tx.find_file(owner, id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        tx.soft_delete_file(id, Utc::now()).await?;
        tx.commit().await?;
        info!(%owner, file_id = %id, "Soft-deleted file");
        Ok(())
    }

    /// Move a file to another folder. Metadata-only and synchronous.
    pub async fn move_file(
        &self,
        owner: OwnerId,
        id: FileId,
        target_folder: Option<FolderId>,
    ) -> AppResult<File> {
        let mut tx = self.store.begin().await?;
        let mut file = tx
            .find_file(owner, id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;

        if file.folder_id == target_folder {
            tx.rollback().await?;
            return Ok(file);
        }

        let folder_path = match target_folder {
            Some(fid) => Some(
                tx.find_folder(owner, fid)
                    .await?
                    .ok_or_else(|| AppError::not_found("Destination folder not found"))?
                    .path,
            ),
            None => None,
        };

        if tx
            .file_name_exists(owner, target_folder, &file.original_name)
            .await?
        {
            return Err(AppError::conflict(
                "A file with this name already exists at the destination",
            ));
        }

        tx.set_file_folder(id, target_folder, folder_path.as_deref())
            .await?;
        tx.commit().await?;

        file.folder_id = target_folder;
        file.folder_path = folder_path;
        info!(%owner, file_id = %id, "Moved file");
        Ok(file)
    }

    /// Copy a file into another folder.
    ///
    /// The copy goes through the same pipeline as an upload: a fresh
    /// `Pending` row with a fresh key commits first, and the bytes are
    /// duplicated asynchronously by a `CopyBlob` task.
    pub async fn copy_file(
        &self,
        owner: OwnerId,
        id: FileId,
        target_folder: Option<FolderId>,
    ) -> AppResult<File> {
        let mut tx = self.store.begin().await?;
        let src = tx
            .find_file(owner, id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        if src.upload_status != UploadStatus::Completed {
            return Err(AppError::not_found("File not found"));
        }

        let folder_path = match target_folder {
            Some(fid) => Some(
                tx.find_folder(owner, fid)
                    .await?
                    .ok_or_else(|| AppError::not_found("Destination folder not found"))?
                    .path,
            ),
            None => None,
        };

        if tx
            .file_name_exists(owner, target_folder, &src.original_name)
            .await?
        {
            return Err(AppError::conflict(
                "A file with this name already exists at the destination",
            ));
        }

        let dst_key = BlobKey::generate();
        let copy = tx
            .insert_file(&CreateFile {
                owner_id: owner,
                original_name: src.original_name.clone(),
                blob_key: dst_key,
                folder_id: target_folder,
                folder_path,
                size_bytes: src.size_bytes,
                content_type: src.content_type.clone(),
                upload_status: UploadStatus::Pending,
            })
            .await?;

        let queue = self.queue.clone();
        let task = PlacementTask::CopyBlob {
            file_id: copy.id,
            src: src.blob_key,
            dst: dst_key,
        };
        tx.after_commit(Box::new(move || queue.dispatch(task)));
        tx.commit().await?;

        info!(%owner, src_file = %id, copy_file = %copy.id, "Accepted file copy");
        Ok(copy)
    }
}
