//! File entity and upload status.

pub mod model;
pub mod status;

pub use model::{CreateFile, File};
pub use status::UploadStatus;
