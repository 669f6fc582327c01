//! Placement worker configuration.

use serde::{Deserialize, Serialize};

/// Background placement worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent placement workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Capacity of the bounded placement-task queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Seconds to wait for in-flight tasks when shutting down.
    #[serde(default = "default_drain_timeout")]
    pub shutdown_drain_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            shutdown_drain_seconds: default_drain_timeout(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_drain_timeout() -> u64 {
    30
}
