//! Placement worker pool.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use stashbox_core::tasks::TaskReceiver;

use crate::executor::PlacementExecutor;

/// A fixed set of workers draining the placement queue.
///
/// Workers share one receiver behind a mutex; whoever holds it waits for
/// the next task, releases the lock, and executes. The shutdown signal is
/// observed between tasks only, so a task that has started always runs to
/// completion.
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `concurrency` workers on the current runtime.
    pub fn spawn(
        executor: PlacementExecutor,
        receiver: TaskReceiver,
        concurrency: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..concurrency.max(1))
            .map(|worker| {
                let executor = executor.clone();
                let receiver = Arc::clone(&receiver);
                let shutdown = shutdown.clone();
                tokio::spawn(worker_loop(worker, executor, receiver, shutdown))
            })
            .collect();
        info!(concurrency = concurrency.max(1), "Placement workers started");
        Self { handles }
    }

    /// Wait for every worker to stop.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("Placement workers stopped");
    }
}

async fn worker_loop(
    worker: usize,
    executor: PlacementExecutor,
    receiver: Arc<Mutex<TaskReceiver>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let task = tokio::select! {
            _ = shutdown.changed() => continue,
            task = async { receiver.lock().await.recv().await } => task,
        };
        match task {
            Some(task) => executor.execute(task).await,
            // All senders dropped.
            None => break,
        }
    }
    debug!(worker, "Placement worker stopped");
}
