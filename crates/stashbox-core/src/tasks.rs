//! Bounded queue of asynchronous byte-placement tasks.
//!
//! Upload and copy requests commit their metadata first and only then
//! dispatch a task here (from an after-commit hook), so a worker can never
//! observe a task for a row that might still be rolled back. The queue is
//! bounded; `dispatch` never blocks the request path. A task that cannot
//! be enqueued is only logged: the row stays `Pending` and the sweeper
//! reconciles it later.

use tokio::sync::mpsc;
use tracing::warn;

use crate::traits::blob::StagedBlob;
use crate::types::{BlobKey, FileId};

/// A unit of asynchronous placement work.
#[derive(Debug, Clone)]
pub enum PlacementTask {
    /// Move staged upload bytes into the blob store under `key`, then
    /// flip the file row to `Completed`/`Failed`.
    Place {
        /// The metadata row the task resolves.
        file_id: FileId,
        /// Bytes staged during the synchronous part of the upload.
        staged: StagedBlob,
        /// Final blob key.
        key: BlobKey,
    },
    /// Copy an existing blob to a new key, then flip the copy's row.
    CopyBlob {
        /// The metadata row of the copy.
        file_id: FileId,
        /// Key of the source blob.
        src: BlobKey,
        /// Key for the new blob.
        dst: BlobKey,
    },
}

impl PlacementTask {
    /// The file row this task will resolve.
    pub fn file_id(&self) -> FileId {
        match self {
            Self::Place { file_id, .. } | Self::CopyBlob { file_id, .. } => *file_id,
        }
    }
}

/// Sending half of the placement queue, held by the upload pipeline.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<PlacementTask>,
}

/// Receiving half, drained by the worker pool.
pub type TaskReceiver = mpsc::Receiver<PlacementTask>;

impl TaskQueue {
    /// Create a queue with the given capacity.
    pub fn bounded(capacity: usize) -> (Self, TaskReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Enqueue a task without blocking.
    ///
    /// Failure to enqueue is recorded and swallowed: the affected row stays
    /// in a non-terminal status and the sweeper recovers or purges it.
    pub fn dispatch(&self, task: PlacementTask) {
        let file_id = task.file_id();
        match self.sender.try_send(task) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%file_id, "placement queue full, task dropped for sweeper recovery");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(%file_id, "placement queue closed, task dropped");
            }
        }
    }
}
