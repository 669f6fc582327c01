//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stashbox_core::types::{BlobKey, FileId, FolderId, OwnerId};

use super::status::UploadStatus;

/// A file's metadata record.
///
/// The record is the unit of visibility: it exists (as `Pending`) before
/// the bytes are durably placed, and `folder_path` denormalizes the owning
/// folder's materialized path so subtree operations can address files with
/// a single prefix-scoped statement.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// The owning user.
    pub owner_id: OwnerId,
    /// Original (sanitized) display name, including extension.
    pub original_name: String,
    /// Opaque key of the bytes in the blob store.
    pub blob_key: BlobKey,
    /// Containing folder (`None` for root-level files).
    pub folder_id: Option<FolderId>,
    /// Copy of the containing folder's path (`None` for root-level files).
    /// Rewritten whenever the folder or any ancestor moves.
    pub folder_path: Option<String>,
    /// Size in bytes, as claimed at upload time.
    pub size_bytes: i64,
    /// Resolved MIME type.
    pub content_type: Option<String>,
    /// Placement progress.
    pub upload_status: UploadStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// When the record was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl File {
    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.original_name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.original_name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// The file owner.
    pub owner_id: OwnerId,
    /// Sanitized display name.
    pub original_name: String,
    /// Blob key the bytes will be placed under.
    pub blob_key: BlobKey,
    /// Containing folder (`None` for root).
    pub folder_id: Option<FolderId>,
    /// Path of the containing folder at creation time.
    pub folder_path: Option<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Resolved MIME type.
    pub content_type: Option<String>,
    /// Initial status (`Pending` for uploads and copies).
    pub upload_status: UploadStatus,
}
