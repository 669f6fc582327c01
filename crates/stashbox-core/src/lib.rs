//! # stashbox-core
//!
//! Core crate for Stashbox. Contains configuration schemas, typed
//! identifiers, pagination types, the blob store contract, the bounded
//! placement-task queue, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Stashbox crates.

pub mod config;
pub mod error;
pub mod result;
pub mod tasks;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
