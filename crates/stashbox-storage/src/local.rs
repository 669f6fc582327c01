//! Local filesystem blob store.

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use stashbox_core::error::{AppError, ErrorKind};
use stashbox_core::result::AppResult;
use stashbox_core::traits::blob::{BlobStore, StagedBlob};
use stashbox_core::types::BlobKey;

/// Name of the staging directory under the storage root.
const STAGING_DIR: &str = ".tmp";

/// Blob store rooted at a local directory.
///
/// Committed blobs live directly under the root, named by their key.
/// Staged bytes live under `.tmp/` with a random name; commit is a
/// same-filesystem rename, so a blob is either fully present under its
/// key or not there at all.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    staging: PathBuf,
}

impl LocalBlobStore {
    /// Create a blob store rooted at the given path, creating the root
    /// and staging directories if needed.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root, staging })
    }

    fn blob_path(&self, key: BlobKey) -> PathBuf {
        self.root.join(key.to_string())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn stage(&self, data: Bytes) -> AppResult<StagedBlob> {
        let temp_path = self.staging.join(Uuid::new_v4().to_string());
        fs::write(&temp_path, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to stage upload bytes", e)
        })?;
        debug!(path = %temp_path.display(), bytes = data.len(), "Staged blob");
        Ok(StagedBlob { temp_path })
    }

    async fn commit(&self, staged: &StagedBlob, key: BlobKey) -> AppResult<()> {
        let dest = self.blob_path(key);
        fs::rename(&staged.temp_path, &dest).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to commit staged blob {key}"),
                e,
            )
        })?;
        debug!(%key, "Committed blob");
        Ok(())
    }

    async fn discard(&self, staged: &StagedBlob) {
        if let Err(e) = fs::remove_file(&staged.temp_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %staged.temp_path.display(), error = %e, "Failed to discard staged blob");
            }
        }
    }

    async fn copy(&self, src: BlobKey, dst: BlobKey) -> AppResult<()> {
        let src_path = self.blob_path(src);
        let dst_path = self.blob_path(dst);
        fs::copy(&src_path, &dst_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {src}"))
            } else {
                AppError::with_source(ErrorKind::Storage, format!("Failed to copy blob {src}"), e)
            }
        })?;
        Ok(())
    }

    async fn delete(&self, key: BlobKey) -> AppResult<bool> {
        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob {key}"),
                e,
            )),
        }
    }

    async fn exists(&self, key: BlobKey) -> AppResult<bool> {
        match fs::try_exists(self.blob_path(key)).await {
            Ok(exists) => Ok(exists),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to check blob {key}"),
                e,
            )),
        }
    }

    async fn read_bytes(&self, key: BlobKey) -> AppResult<Bytes> {
        let data = fs::read(self.blob_path(key)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {key}"))
            } else {
                AppError::with_source(ErrorKind::Storage, format!("Failed to read blob {key}"), e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn sweep_staging(&self, cutoff: SystemTime) -> AppResult<u64> {
        let mut entries = fs::read_dir(&self.staging).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read staging directory", e)
        })?;

        let mut removed = 0u64;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read staging directory", e)
        })? {
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let modified = match meta.modified() {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            if modified >= cutoff {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                // A concurrent commit renamed it away; nothing to clean.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Failed to remove staged blob");
                }
            }
        }
        Ok(removed)
    }
}
