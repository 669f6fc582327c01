//! # stashbox-api
//!
//! The HTTP surface: a thin axum layer that extracts the owner identity,
//! translates requests into service calls, and maps domain errors to
//! status codes. All semantics live in `stashbox-service`.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
