//! Request extractors: owner identity and pagination.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Deserialize;

use stashbox_core::error::AppError;
use stashbox_core::types::{OwnerId, PageRequest};

use crate::error::ApiError;

/// Header carrying the caller's owner id.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Extracted owner identity.
///
/// Identity is taken at face value from the `X-Owner-Id` header; every
/// query is scoped to it, so the worst a forged header yields is another
/// tenant's ids answering `NotFound`.
#[derive(Debug, Clone, Copy)]
pub struct Owner(pub OwnerId);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError(AppError::validation("Missing X-Owner-Id header")))?;
        let id: i64 = raw
            .trim()
            .parse()
            .map_err(|_| ApiError(AppError::validation("Invalid X-Owner-Id header")))?;
        if id <= 0 {
            return Err(ApiError(AppError::validation("Invalid X-Owner-Id header")));
        }
        Ok(Owner(OwnerId(id)))
    }
}

/// Pagination query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PaginationParams {
    /// Convert to a clamped [`PageRequest`].
    pub fn into_page_request(self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.page_size.unwrap_or(defaults.page_size),
        )
    }
}
