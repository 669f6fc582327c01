//! # stashbox-service
//!
//! Business logic: the folder tree over the materialized-path index and
//! the staged upload pipeline. Services own no state beyond handles to
//! the metadata store, the blob store, and the placement queue; every
//! operation runs inside a single metadata transaction.

pub mod file;
pub mod folder;

pub use file::service::{FileDownload, FileService};
pub use folder::service::{FolderContents, FolderService};
