//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stashbox_core::types::{FolderId, OwnerId};

/// A folder in the per-owner hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// The owning user; folders are never shared across owners.
    pub owner_id: OwnerId,
    /// Display name (unique among live siblings).
    pub name: String,
    /// Parent folder ID (`None` for root folders).
    pub parent_id: Option<FolderId>,
    /// Materialized path encoding the ancestor-id chain (e.g. `u7.f1.f2`).
    pub path: String,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// When the folder was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data required to create a new folder row.
///
/// The path is not part of this struct: it can only be computed once the
/// store has allocated the id, inside the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// The folder owner.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Parent folder (`None` for root).
    pub parent_id: Option<FolderId>,
}
