//! Metadata store contract.
//!
//! Every read and write goes through a [`MetadataTx`]. A transaction is
//! atomic as seen by concurrent readers: in particular the bulk
//! prefix-scoped operations (`rewrite_*`, `soft_delete_*_under`) are each
//! a single statement and no reader can observe a partially rewritten
//! subtree. Dropping a transaction without calling [`MetadataTx::commit`]
//! rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stashbox_core::result::AppResult;
use stashbox_core::types::{BlobKey, FileId, FolderId, OwnerId, PageRequest};
use stashbox_entity::file::{CreateFile, File, UploadStatus};
use stashbox_entity::folder::{CreateFolder, Folder};

/// Callback run after a transaction durably commits.
///
/// Hooks are how the upload pipeline defers placement-task dispatch until
/// the metadata it refers to can no longer be rolled back. Hooks never run
/// on rollback.
pub type CommitHook = Box<dyn FnOnce() + Send + 'static>;

/// Factory for metadata transactions.
#[async_trait]
pub trait MetadataStore: Send + Sync + std::fmt::Debug + 'static {
    /// Open a new transaction.
    async fn begin(&self) -> AppResult<Box<dyn MetadataTx>>;
}

/// A single metadata transaction.
///
/// All row reads are scoped to live (non-soft-deleted) rows unless the
/// method says otherwise. Inserts enforce the live-row uniqueness
/// constraints (folders `(owner_id, parent_id, name)`, files
/// `(owner_id, folder_id, original_name)`) and fail with
/// [`ErrorKind::Conflict`](stashbox_core::error::ErrorKind::Conflict);
/// the constraint is the authoritative arbiter for racing duplicates.
#[async_trait]
pub trait MetadataTx: Send {
    // ── folders ────────────────────────────────────────────────────────

    /// Insert a folder row, allocating its id. The materialized path is
    /// left empty; callers compute it from the returned id and persist it
    /// with [`set_folder_path`](Self::set_folder_path) before committing.
    async fn insert_folder(&mut self, data: &CreateFolder) -> AppResult<Folder>;

    /// Persist the materialized path of a freshly inserted folder.
    async fn set_folder_path(&mut self, id: FolderId, path: &str) -> AppResult<()>;

    /// Find a live folder owned by `owner`.
    async fn find_folder(&mut self, owner: OwnerId, id: FolderId) -> AppResult<Option<Folder>>;

    /// Find a live folder owned by `owner` and take an exclusive row lock
    /// on it for the remainder of the transaction.
    async fn lock_folder(&mut self, owner: OwnerId, id: FolderId) -> AppResult<Option<Folder>>;

    /// Whether a live sibling with this name already exists.
    async fn folder_name_exists(
        &mut self,
        owner: OwnerId,
        parent_id: Option<FolderId>,
        name: &str,
    ) -> AppResult<bool>;

    /// Update a folder's display name. Paths are untouched.
    async fn update_folder_name(&mut self, id: FolderId, name: &str) -> AppResult<()>;

    /// Repoint a folder at a new parent. Paths are rewritten separately
    /// via [`rewrite_folder_paths`](Self::rewrite_folder_paths).
    async fn set_folder_parent(
        &mut self,
        id: FolderId,
        parent_id: Option<FolderId>,
    ) -> AppResult<()>;

    /// Rewrite the paths of every folder under `old_prefix` (inclusive)
    /// to carry `new_prefix`, in one atomic statement. Returns the number
    /// of rows touched.
    async fn rewrite_folder_paths(
        &mut self,
        owner: OwnerId,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64>;

    /// Soft-delete every live folder under `prefix` (inclusive), stamping
    /// all of them with the same `deleted_at`. One atomic statement.
    async fn soft_delete_folders_under(
        &mut self,
        owner: OwnerId,
        prefix: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// List live immediate children of a folder, ordered by name.
    async fn list_child_folders(
        &mut self,
        owner: OwnerId,
        parent_id: Option<FolderId>,
        page: &PageRequest,
    ) -> AppResult<Vec<Folder>>;

    /// Hard-delete folders soft-deleted strictly before `cutoff`.
    async fn hard_delete_folders_deleted_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64>;

    // ── files ──────────────────────────────────────────────────────────

    /// Insert a file row, allocating its id.
    async fn insert_file(&mut self, data: &CreateFile) -> AppResult<File>;

    /// Find a live file owned by `owner`.
    async fn find_file(&mut self, owner: OwnerId, id: FileId) -> AppResult<Option<File>>;

    /// Whether a live file with this name already exists in the folder.
    async fn file_name_exists(
        &mut self,
        owner: OwnerId,
        folder_id: Option<FolderId>,
        name: &str,
    ) -> AppResult<bool>;

    /// Set a file's upload status.
    async fn update_upload_status(&mut self, id: FileId, status: UploadStatus) -> AppResult<()>;

    /// Repoint a file at a new folder, rewriting its denormalized path.
    async fn set_file_folder(
        &mut self,
        id: FileId,
        folder_id: Option<FolderId>,
        folder_path: Option<&str>,
    ) -> AppResult<()>;

    /// Soft-delete a single file.
    async fn soft_delete_file(&mut self, id: FileId, deleted_at: DateTime<Utc>) -> AppResult<()>;

    /// Rewrite the denormalized `folder_path` of every file under
    /// `old_prefix` (inclusive). One atomic statement.
    async fn rewrite_file_folder_paths(
        &mut self,
        owner: OwnerId,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64>;

    /// Soft-delete every live file under `prefix` (inclusive), stamping
    /// all of them with the same `deleted_at`. One atomic statement.
    async fn soft_delete_files_under(
        &mut self,
        owner: OwnerId,
        prefix: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// List live `Completed` files in a folder, ordered by name.
    async fn list_completed_files(
        &mut self,
        owner: OwnerId,
        folder_id: Option<FolderId>,
        page: &PageRequest,
    ) -> AppResult<Vec<File>>;

    /// Files still `Pending`/`Failed` that were created before `cutoff`.
    async fn find_unresolved_uploads(&mut self, cutoff: DateTime<Utc>) -> AppResult<Vec<File>>;

    /// Hard-delete `Pending`/`Failed` rows created before `cutoff`.
    async fn purge_unresolved_uploads(&mut self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Blob keys of files soft-deleted strictly before `cutoff`.
    async fn blob_keys_deleted_before(&mut self, cutoff: DateTime<Utc>)
        -> AppResult<Vec<BlobKey>>;

    /// Hard-delete files soft-deleted strictly before `cutoff`.
    async fn hard_delete_files_deleted_before(&mut self, cutoff: DateTime<Utc>)
        -> AppResult<u64>;

    // ── transaction control ────────────────────────────────────────────

    /// Register a hook that runs only after this transaction durably
    /// commits.
    fn after_commit(&mut self, hook: CommitHook);

    /// Commit the transaction, then run registered hooks in order.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Roll the transaction back, discarding registered hooks.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
