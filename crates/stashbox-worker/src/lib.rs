//! # stashbox-worker
//!
//! Background execution: the placement worker pool that drains the
//! bounded task queue, and the retention/recovery sweeper that reconciles
//! rows whose placement never resolved and reclaims soft-deleted data.

pub mod executor;
pub mod pool;
pub mod sweeper;

pub use executor::PlacementExecutor;
pub use pool::WorkerPool;
pub use sweeper::Sweeper;
