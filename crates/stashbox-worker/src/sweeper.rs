//! Retention and recovery sweeper.
//!
//! Three periodic passes reconcile everything the request path and the
//! workers leave behind:
//!
//! 1. recovery: unresolved (`Pending`/`Failed`) rows past the recovery
//!    threshold whose blob already exists are flipped `Completed`; the
//!    bytes made it, only the status flip was lost.
//! 2. purge: unresolved rows past twice the recovery threshold are hard
//!    deleted; the bytes never made it and never will.
//! 3. reclamation: rows soft-deleted past the retention window are hard
//!    deleted, then their blobs; metadata strictly before bytes, so a
//!    crash mid-pass leaves orphan blobs (retried next sweep), never
//!    dangling metadata.
//! 4. staging cleanup: staged upload bytes older than the purge window
//!    are removed; their placement task was dropped and the row is gone,
//!    so nothing will ever commit them.
//!
//! Every pass takes an explicit `now` so tests drive time instead of
//! backdating rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use stashbox_core::config::SweeperConfig;
use stashbox_core::result::AppResult;
use stashbox_core::traits::blob::BlobStore;
use stashbox_database::MetadataStore;
use stashbox_entity::file::UploadStatus;

#[derive(Debug, Clone)]
pub struct Sweeper {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            config,
        }
    }

    /// Run sweeps on the configured period until cancelled.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup is quiet.
        interval.tick().await;

        info!(period_seconds = self.config.period_seconds, "Sweeper started");
        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.sweep(Utc::now()).await;
                }
            }
        }
        info!("Sweeper stopped");
    }

    /// Run all passes once. Pass failures are logged, never fatal;
    /// the next sweep retries.
    pub async fn sweep(&self, now: DateTime<Utc>) {
        if let Err(e) = self.recover_stale_uploads(now).await {
            warn!(error = %e, "Stale upload recovery pass failed");
        }
        if let Err(e) = self.purge_stale_uploads(now).await {
            warn!(error = %e, "Stale upload purge pass failed");
        }
        if let Err(e) = self.reclaim_soft_deleted(now).await {
            warn!(error = %e, "Soft-delete reclamation pass failed");
        }
        if let Err(e) = self.sweep_staging(now).await {
            warn!(error = %e, "Staging cleanup pass failed");
        }
    }

    /// Flip unresolved rows whose blob exists to `Completed`.
    pub async fn recover_stale_uploads(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = now - self.config.stale_recovery();
        let mut tx = self.store.begin().await?;
        let stale = tx.find_unresolved_uploads(cutoff).await?;

        let mut recovered = 0u64;
        for file in stale {
            if self.blobs.exists(file.blob_key).await? {
                tx.update_upload_status(file.id, UploadStatus::Completed)
                    .await?;
                recovered += 1;
            }
        }
        tx.commit().await?;

        if recovered > 0 {
            info!(recovered, "Recovered stale uploads");
        }
        Ok(recovered)
    }

    /// Hard-delete unresolved rows old enough that recovery has had its
    /// chance.
    pub async fn purge_stale_uploads(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = now - self.config.stale_purge();
        let mut tx = self.store.begin().await?;
        let purged = tx.purge_unresolved_uploads(cutoff).await?;
        tx.commit().await?;

        if purged > 0 {
            info!(purged, "Purged unrecoverable uploads");
        }
        Ok(purged)
    }

    /// Hard-delete rows past the soft-delete retention window, then
    /// best-effort delete their blobs.
    pub async fn reclaim_soft_deleted(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = now - self.config.delete_retention();

        let mut tx = self.store.begin().await?;
        let keys = tx.blob_keys_deleted_before(cutoff).await?;
        let files = tx.hard_delete_files_deleted_before(cutoff).await?;
        let folders = tx.hard_delete_folders_deleted_before(cutoff).await?;
        tx.commit().await?;

        for key in &keys {
            if let Err(e) = self.blobs.delete(*key).await {
                warn!(%key, error = %e, "Failed to reclaim blob, retrying next sweep");
            }
        }

        if files > 0 || folders > 0 {
            info!(files, folders, blobs = keys.len(), "Reclaimed soft-deleted data");
        }
        Ok(files + folders)
    }

    /// Remove staged upload bytes old enough that their rows have been
    /// purged. Covers placement tasks dropped on a full queue.
    pub async fn sweep_staging(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = now - self.config.stale_purge();
        let removed = self.blobs.sweep_staging(cutoff.into()).await?;

        if removed > 0 {
            info!(removed, "Removed abandoned staging files");
        }
        Ok(removed)
    }
}
