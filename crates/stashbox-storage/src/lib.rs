//! # stashbox-storage
//!
//! Blob storage backends. Currently a local filesystem store with a
//! staging area for the two-phase upload pipeline: bytes land in a
//! `.tmp` directory first and are atomically renamed into place once the
//! placement task runs.

pub mod local;

pub use local::LocalBlobStore;
