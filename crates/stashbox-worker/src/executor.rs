//! Executes placement tasks and resolves their file rows.

use std::sync::Arc;

use tracing::{debug, warn};

use stashbox_core::result::AppResult;
use stashbox_core::tasks::PlacementTask;
use stashbox_core::traits::blob::BlobStore;
use stashbox_core::types::FileId;
use stashbox_database::MetadataStore;
use stashbox_entity::file::UploadStatus;

/// Runs a single placement task to completion.
///
/// The byte operation and the status flip are deliberately decoupled: the
/// flip runs in its own transaction after the bytes settle, and a failure
/// to persist it is only logged. A row left `Pending` with its blob in
/// place is exactly what the sweeper's recovery pass repairs.
#[derive(Debug, Clone)]
pub struct PlacementExecutor {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl PlacementExecutor {
    pub fn new(store: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Execute a task and flip its row to a terminal status.
    pub async fn execute(&self, task: PlacementTask) {
        let file_id = task.file_id();
        let status = match self.place(task).await {
            Ok(()) => {
                debug!(%file_id, "Placement completed");
                UploadStatus::Completed
            }
            Err(e) => {
                warn!(%file_id, error = %e, "Placement failed");
                UploadStatus::Failed
            }
        };
        if let Err(e) = self.persist_status(file_id, status).await {
            warn!(%file_id, %status, error = %e, "Failed to persist upload status, leaving row for sweeper");
        }
    }

    async fn place(&self, task: PlacementTask) -> AppResult<()> {
        match task {
            PlacementTask::Place { staged, key, .. } => {
                match self.blobs.commit(&staged, key).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        self.blobs.discard(&staged).await;
                        Err(e)
                    }
                }
            }
            PlacementTask::CopyBlob { src, dst, .. } => self.blobs.copy(src, dst).await,
        }
    }

    async fn persist_status(&self, id: FileId, status: UploadStatus) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        tx.update_upload_status(id, status).await?;
        tx.commit().await
    }
}
