//! PostgreSQL implementation of the metadata store contract.
//!
//! Inserts rely on the partial unique indexes declared in the migrations
//! to arbitrate racing duplicates; a unique violation surfaces as
//! [`ErrorKind::Conflict`]. The bulk prefix-scoped operations are single
//! `UPDATE` statements so readers never observe a half-rewritten subtree.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use stashbox_core::error::{AppError, ErrorKind};
use stashbox_core::result::AppResult;
use stashbox_core::types::{BlobKey, FileId, FolderId, OwnerId, PageRequest};
use stashbox_entity::file::{CreateFile, File, UploadStatus};
use stashbox_entity::folder::{CreateFolder, Folder};

use crate::contract::{CommitHook, MetadataStore, MetadataTx};

/// Metadata store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn begin(&self) -> AppResult<Box<dyn MetadataTx>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgTx {
            tx,
            hooks: Vec::new(),
        }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
    hooks: Vec<CommitHook>,
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

#[async_trait]
impl MetadataTx for PgTx {
    async fn insert_folder(&mut self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (owner_id, name, parent_id, path) \
             VALUES ($1, $2, $3, '') RETURNING *",
        )
        .bind(data.owner_id)
        .bind(&data.name)
        .bind(data.parent_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("A folder with this name already exists here")
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to insert folder", e)
            }
        })
    }

    async fn set_folder_path(&mut self, id: FolderId, path: &str) -> AppResult<()> {
        sqlx::query("UPDATE folders SET path = $2 WHERE id = $1")
            .bind(id)
            .bind(path)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to set folder path"))?;
        Ok(())
    }

    async fn find_folder(&mut self, owner: OwnerId, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE id = $1 AND owner_id = $2 AND NOT deleted",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("Failed to find folder"))
    }

    async fn lock_folder(&mut self, owner: OwnerId, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE id = $1 AND owner_id = $2 AND NOT deleted FOR UPDATE",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("Failed to lock folder"))
    }

    async fn folder_name_exists(
        &mut self,
        owner: OwnerId,
        parent_id: Option<FolderId>,
        name: &str,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM folders \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 \
               AND name = $3 AND NOT deleted)",
        )
        .bind(owner)
        .bind(parent_id)
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("Failed to check folder name"))
    }

    async fn update_folder_name(&mut self, id: FolderId, name: &str) -> AppResult<()> {
        sqlx::query("UPDATE folders SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::conflict("A folder with this name already exists here")
                } else {
                    AppError::with_source(ErrorKind::Database, "Failed to rename folder", e)
                }
            })?;
        Ok(())
    }

    async fn set_folder_parent(
        &mut self,
        id: FolderId,
        parent_id: Option<FolderId>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE folders SET parent_id = $2 WHERE id = $1")
            .bind(id)
            .bind(parent_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::conflict("A folder with this name already exists here")
                } else {
                    AppError::with_source(ErrorKind::Database, "Failed to move folder", e)
                }
            })?;
        Ok(())
    }

    async fn rewrite_folder_paths(
        &mut self,
        owner: OwnerId,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE folders \
             SET path = $3 || substr(path, char_length($2) + 1) \
             WHERE owner_id = $1 AND (path = $2 OR path LIKE $2 || '.%')",
        )
        .bind(owner)
        .bind(old_prefix)
        .bind(new_prefix)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to rewrite folder paths"))?;
        Ok(result.rows_affected())
    }

    async fn soft_delete_folders_under(
        &mut self,
        owner: OwnerId,
        prefix: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE folders SET deleted = TRUE, deleted_at = $3 \
             WHERE owner_id = $1 AND (path = $2 OR path LIKE $2 || '.%') AND NOT deleted",
        )
        .bind(owner)
        .bind(prefix)
        .bind(deleted_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to soft-delete folders"))?;
        Ok(result.rows_affected())
    }

    async fn list_child_folders(
        &mut self,
        owner: OwnerId,
        parent_id: Option<FolderId>,
        page: &PageRequest,
    ) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND NOT deleted \
             ORDER BY name ASC LIMIT $3 OFFSET $4",
        )
        .bind(owner)
        .bind(parent_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("Failed to list child folders"))
    }

    async fn hard_delete_folders_deleted_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM folders WHERE deleted AND deleted_at < $1")
            .bind(cutoff)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to purge deleted folders"))?;
        Ok(result.rows_affected())
    }

    async fn insert_file(&mut self, data: &CreateFile) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files \
             (owner_id, original_name, blob_key, folder_id, folder_path, \
              size_bytes, content_type, upload_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(data.owner_id)
        .bind(&data.original_name)
        .bind(data.blob_key)
        .bind(data.folder_id)
        .bind(&data.folder_path)
        .bind(data.size_bytes)
        .bind(&data.content_type)
        .bind(data.upload_status)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("A file with this name already exists here")
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to insert file", e)
            }
        })
    }

    async fn find_file(&mut self, owner: OwnerId, id: FileId) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE id = $1 AND owner_id = $2 AND NOT deleted",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("Failed to find file"))
    }

    async fn file_name_exists(
        &mut self,
        owner: OwnerId,
        folder_id: Option<FolderId>,
        name: &str,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM files \
             WHERE owner_id = $1 AND folder_id IS NOT DISTINCT FROM $2 \
               AND original_name = $3 AND NOT deleted)",
        )
        .bind(owner)
        .bind(folder_id)
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("Failed to check file name"))
    }

    async fn update_upload_status(&mut self, id: FileId, status: UploadStatus) -> AppResult<()> {
        sqlx::query("UPDATE files SET upload_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to update upload status"))?;
        Ok(())
    }

    async fn set_file_folder(
        &mut self,
        id: FileId,
        folder_id: Option<FolderId>,
        folder_path: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE files SET folder_id = $2, folder_path = $3 WHERE id = $1")
            .bind(id)
            .bind(folder_id)
            .bind(folder_path)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::conflict("A file with this name already exists here")
                } else {
                    AppError::with_source(ErrorKind::Database, "Failed to move file", e)
                }
            })?;
        Ok(())
    }

    async fn soft_delete_file(&mut self, id: FileId, deleted_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE files SET deleted = TRUE, deleted_at = $2 WHERE id = $1")
            .bind(id)
            .bind(deleted_at)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to soft-delete file"))?;
        Ok(())
    }

    async fn rewrite_file_folder_paths(
        &mut self,
        owner: OwnerId,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE files \
             SET folder_path = $3 || substr(folder_path, char_length($2) + 1) \
             WHERE owner_id = $1 \
               AND (folder_path = $2 OR folder_path LIKE $2 || '.%')",
        )
        .bind(owner)
        .bind(old_prefix)
        .bind(new_prefix)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to rewrite file paths"))?;
        Ok(result.rows_affected())
    }

    async fn soft_delete_files_under(
        &mut self,
        owner: OwnerId,
        prefix: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE files SET deleted = TRUE, deleted_at = $3 \
             WHERE owner_id = $1 \
               AND (folder_path = $2 OR folder_path LIKE $2 || '.%') AND NOT deleted",
        )
        .bind(owner)
        .bind(prefix)
        .bind(deleted_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to soft-delete files"))?;
        Ok(result.rows_affected())
    }

    async fn list_completed_files(
        &mut self,
        owner: OwnerId,
        folder_id: Option<FolderId>,
        page: &PageRequest,
    ) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE owner_id = $1 AND folder_id IS NOT DISTINCT FROM $2 \
               AND upload_status = 'COMPLETED' AND NOT deleted \
             ORDER BY original_name ASC LIMIT $3 OFFSET $4",
        )
        .bind(owner)
        .bind(folder_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("Failed to list files"))
    }

    async fn find_unresolved_uploads(&mut self, cutoff: DateTime<Utc>) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE upload_status IN ('PENDING', 'FAILED') AND created_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("Failed to find unresolved uploads"))
    }

    async fn purge_unresolved_uploads(&mut self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM files \
             WHERE upload_status IN ('PENDING', 'FAILED') AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to purge unresolved uploads"))?;
        Ok(result.rows_affected())
    }

    async fn blob_keys_deleted_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<BlobKey>> {
        sqlx::query_scalar::<_, BlobKey>(
            "SELECT blob_key FROM files WHERE deleted AND deleted_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("Failed to list reclaimable blob keys"))
    }

    async fn hard_delete_files_deleted_before(&mut self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM files WHERE deleted AND deleted_at < $1")
            .bind(cutoff)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to purge deleted files"))?;
        Ok(result.rows_affected())
    }

    fn after_commit(&mut self, hook: CommitHook) {
        self.hooks.push(hook);
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { tx, hooks } = *self;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;
        for hook in hooks {
            hook();
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to roll back transaction", e)
        })
    }
}
