//! Shared value types: identifiers and pagination.

pub mod id;
pub mod pagination;

pub use id::{BlobKey, FileId, FolderId, OwnerId};
pub use pagination::PageRequest;
