//! Materialized-path encoding.
//!
//! A folder's path is the chain of its ancestor **ids** (never names),
//! joined by [`SEP`]: a root folder owned by user 7 with id 1 has path
//! `u7.f1`, a child with id 2 has `u7.f1.f2`. Because paths encode ids,
//! renaming a folder never changes any path; only moves do.

use stashbox_core::types::{FolderId, OwnerId};

/// Separator between path segments.
pub const SEP: char = '.';

/// Tenant prefix that scopes every path to a single owner.
pub fn tenant_prefix(owner: OwnerId) -> String {
    format!("u{owner}")
}

/// The path segment contributed by a single folder.
pub fn segment(id: FolderId) -> String {
    format!("f{id}")
}

/// Path of a root folder (no parent).
pub fn root_path(owner: OwnerId, id: FolderId) -> String {
    format!("{}{}{}", tenant_prefix(owner), SEP, segment(id))
}

/// Path of a folder under the given parent path.
pub fn child_path(parent_path: &str, id: FolderId) -> String {
    format!("{}{}{}", parent_path, SEP, segment(id))
}

/// Prefix containment: `path` is under `prefix` if it equals the prefix
/// or continues it with a separator. A plain `starts_with` would wrongly
/// match `u1.f12` under `u1.f1`.
pub fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path[prefix.len()..].starts_with(SEP))
}

/// Rewrite `path` so that the leading `old_prefix` becomes `new_prefix`.
///
/// Callers must have checked [`is_under`] first.
pub fn replace_prefix(path: &str, old_prefix: &str, new_prefix: &str) -> String {
    format!("{}{}", new_prefix, &path[old_prefix.len()..])
}
