//! Folder entity and materialized-path helpers.

pub mod model;
pub mod path;

pub use model::{CreateFolder, Folder};
