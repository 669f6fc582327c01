//! In-memory implementation of the metadata store contract.
//!
//! Transactions are serializable: `begin` takes the store-wide lock and a
//! transaction works on a cloned copy of the state, so readers either see
//! the state before a commit or after it, never in between. That gives
//! the bulk prefix operations their required atomicity for free. Row
//! locks are therefore trivially satisfied; `lock_folder` still performs
//! the owner-scoped live-row read the contract promises.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use stashbox_core::error::AppError;
use stashbox_core::result::AppResult;
use stashbox_core::types::{BlobKey, FileId, FolderId, OwnerId, PageRequest};
use stashbox_entity::file::{CreateFile, File, UploadStatus};
use stashbox_entity::folder::path;
use stashbox_entity::folder::{CreateFolder, Folder};

use crate::contract::{CommitHook, MetadataStore, MetadataTx};

/// Complete store contents. Cloned per transaction.
#[derive(Debug, Clone, Default)]
struct State {
    folders: BTreeMap<i64, Folder>,
    files: BTreeMap<i64, File>,
    next_folder_id: i64,
    next_file_id: i64,
}

/// Embedded metadata store backed by process memory.
///
/// Non-durable; used as the default backend and by the test suite.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
    state: Arc<Mutex<State>>,
}

impl MemoryMetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn begin(&self) -> AppResult<Box<dyn MetadataTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            hooks: Vec::new(),
        }))
    }
}

/// A transaction over a working copy of the store state.
struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
    hooks: Vec<CommitHook>,
}

impl MemoryTx {
    fn live_folder(&self, owner: OwnerId, id: FolderId) -> Option<&Folder> {
        self.working
            .folders
            .get(&id.0)
            .filter(|f| f.owner_id == owner && !f.deleted)
    }
}

#[async_trait]
impl MetadataTx for MemoryTx {
    async fn insert_folder(&mut self, data: &CreateFolder) -> AppResult<Folder> {
        if self
            .folder_name_exists(data.owner_id, data.parent_id, &data.name)
            .await?
        {
            return Err(AppError::conflict(format!(
                "Folder '{}' already exists here",
                data.name
            )));
        }
        self.working.next_folder_id += 1;
        let folder = Folder {
            id: FolderId(self.working.next_folder_id),
            owner_id: data.owner_id,
            name: data.name.clone(),
            parent_id: data.parent_id,
            path: String::new(),
            created_at: Utc::now(),
            deleted: false,
            deleted_at: None,
        };
        self.working.folders.insert(folder.id.0, folder.clone());
        Ok(folder)
    }

    async fn set_folder_path(&mut self, id: FolderId, new_path: &str) -> AppResult<()> {
        let folder = self
            .working
            .folders
            .get_mut(&id.0)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        folder.path = new_path.to_string();
        Ok(())
    }

    async fn find_folder(&mut self, owner: OwnerId, id: FolderId) -> AppResult<Option<Folder>> {
        Ok(self.live_folder(owner, id).cloned())
    }

    async fn lock_folder(&mut self, owner: OwnerId, id: FolderId) -> AppResult<Option<Folder>> {
        // The whole store is exclusively held by this transaction, which
        // subsumes the per-row lock.
        Ok(self.live_folder(owner, id).cloned())
    }

    async fn folder_name_exists(
        &mut self,
        owner: OwnerId,
        parent_id: Option<FolderId>,
        name: &str,
    ) -> AppResult<bool> {
        Ok(self.working.folders.values().any(|f| {
            !f.deleted && f.owner_id == owner && f.parent_id == parent_id && f.name == name
        }))
    }

    async fn update_folder_name(&mut self, id: FolderId, name: &str) -> AppResult<()> {
        let folder = self
            .working
            .folders
            .get_mut(&id.0)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        folder.name = name.to_string();
        Ok(())
    }

    async fn set_folder_parent(
        &mut self,
        id: FolderId,
        parent_id: Option<FolderId>,
    ) -> AppResult<()> {
        let folder = self
            .working
            .folders
            .get_mut(&id.0)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        folder.parent_id = parent_id;
        Ok(())
    }

    async fn rewrite_folder_paths(
        &mut self,
        owner: OwnerId,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64> {
        let mut touched = 0;
        for folder in self.working.folders.values_mut() {
            if folder.owner_id == owner && path::is_under(&folder.path, old_prefix) {
                folder.path = path::replace_prefix(&folder.path, old_prefix, new_prefix);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn soft_delete_folders_under(
        &mut self,
        owner: OwnerId,
        prefix: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut touched = 0;
        for folder in self.working.folders.values_mut() {
            if folder.owner_id == owner && !folder.deleted && path::is_under(&folder.path, prefix)
            {
                folder.deleted = true;
                folder.deleted_at = Some(deleted_at);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn list_child_folders(
        &mut self,
        owner: OwnerId,
        parent_id: Option<FolderId>,
        page: &PageRequest,
    ) -> AppResult<Vec<Folder>> {
        let mut children: Vec<&Folder> = self
            .working
            .folders
            .values()
            .filter(|f| !f.deleted && f.owner_id == owner && f.parent_id == parent_id)
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }

    async fn hard_delete_folders_deleted_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let before = self.working.folders.len();
        self.working
            .folders
            .retain(|_, f| !(f.deleted && f.deleted_at.is_some_and(|at| at < cutoff)));
        Ok((before - self.working.folders.len()) as u64)
    }

    async fn insert_file(&mut self, data: &CreateFile) -> AppResult<File> {
        if self
            .file_name_exists(data.owner_id, data.folder_id, &data.original_name)
            .await?
        {
            return Err(AppError::conflict(format!(
                "File '{}' already exists in this folder",
                data.original_name
            )));
        }
        self.working.next_file_id += 1;
        let file = File {
            id: FileId(self.working.next_file_id),
            owner_id: data.owner_id,
            original_name: data.original_name.clone(),
            blob_key: data.blob_key,
            folder_id: data.folder_id,
            folder_path: data.folder_path.clone(),
            size_bytes: data.size_bytes,
            content_type: data.content_type.clone(),
            upload_status: data.upload_status,
            created_at: Utc::now(),
            deleted: false,
            deleted_at: None,
        };
        self.working.files.insert(file.id.0, file.clone());
        Ok(file)
    }

    async fn find_file(&mut self, owner: OwnerId, id: FileId) -> AppResult<Option<File>> {
        Ok(self
            .working
            .files
            .get(&id.0)
            .filter(|f| f.owner_id == owner && !f.deleted)
            .cloned())
    }

    async fn file_name_exists(
        &mut self,
        owner: OwnerId,
        folder_id: Option<FolderId>,
        name: &str,
    ) -> AppResult<bool> {
        Ok(self.working.files.values().any(|f| {
            !f.deleted && f.owner_id == owner && f.folder_id == folder_id && f.original_name == name
        }))
    }

    async fn update_upload_status(&mut self, id: FileId, status: UploadStatus) -> AppResult<()> {
        let file = self
            .working
            .files
            .get_mut(&id.0)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.upload_status = status;
        Ok(())
    }

    async fn set_file_folder(
        &mut self,
        id: FileId,
        folder_id: Option<FolderId>,
        folder_path: Option<&str>,
    ) -> AppResult<()> {
        let file = self
            .working
            .files
            .get_mut(&id.0)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.folder_id = folder_id;
        file.folder_path = folder_path.map(str::to_string);
        Ok(())
    }

    async fn soft_delete_file(&mut self, id: FileId, deleted_at: DateTime<Utc>) -> AppResult<()> {
        let file = self
            .working
            .files
            .get_mut(&id.0)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.deleted = true;
        file.deleted_at = Some(deleted_at);
        Ok(())
    }

    async fn rewrite_file_folder_paths(
        &mut self,
        owner: OwnerId,
        old_prefix: &str,
        new_prefix: &str,
    ) -> AppResult<u64> {
        let mut touched = 0;
        for file in self.working.files.values_mut() {
            if file.owner_id != owner {
                continue;
            }
            if let Some(folder_path) = &file.folder_path {
                if path::is_under(folder_path, old_prefix) {
                    file.folder_path =
                        Some(path::replace_prefix(folder_path, old_prefix, new_prefix));
                    touched += 1;
                }
            }
        }
        Ok(touched)
    }

    async fn soft_delete_files_under(
        &mut self,
        owner: OwnerId,
        prefix: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut touched = 0;
        for file in self.working.files.values_mut() {
            if file.deleted || file.owner_id != owner {
                continue;
            }
            if file
                .folder_path
                .as_deref()
                .is_some_and(|p| path::is_under(p, prefix))
            {
                file.deleted = true;
                file.deleted_at = Some(deleted_at);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn list_completed_files(
        &mut self,
        owner: OwnerId,
        folder_id: Option<FolderId>,
        page: &PageRequest,
    ) -> AppResult<Vec<File>> {
        let mut files: Vec<&File> = self
            .working
            .files
            .values()
            .filter(|f| {
                !f.deleted
                    && f.owner_id == owner
                    && f.folder_id == folder_id
                    && f.upload_status == UploadStatus::Completed
            })
            .collect();
        files.sort_by(|a, b| a.original_name.cmp(&b.original_name));
        Ok(files
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }

    async fn find_unresolved_uploads(&mut self, cutoff: DateTime<Utc>) -> AppResult<Vec<File>> {
        Ok(self
            .working
            .files
            .values()
            .filter(|f| f.upload_status != UploadStatus::Completed && f.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn purge_unresolved_uploads(&mut self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let before = self.working.files.len();
        self.working
            .files
            .retain(|_, f| !(f.upload_status != UploadStatus::Completed && f.created_at < cutoff));
        Ok((before - self.working.files.len()) as u64)
    }

    async fn blob_keys_deleted_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<BlobKey>> {
        Ok(self
            .working
            .files
            .values()
            .filter(|f| f.deleted && f.deleted_at.is_some_and(|at| at < cutoff))
            .map(|f| f.blob_key)
            .collect())
    }

    async fn hard_delete_files_deleted_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let before = self.working.files.len();
        self.working
            .files
            .retain(|_, f| !(f.deleted && f.deleted_at.is_some_and(|at| at < cutoff)));
        Ok((before - self.working.files.len()) as u64)
    }

    fn after_commit(&mut self, hook: CommitHook) {
        self.hooks.push(hook);
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self {
            mut guard,
            working,
            hooks,
        } = *self;
        *guard = working;
        drop(guard);
        for hook in hooks {
            hook();
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        // Dropping the working copy and the guard discards everything.
        Ok(())
    }
}
