//! File upload pipeline and file-level operations.

pub mod naming;
pub mod service;

pub use service::{FileDownload, FileService};
