//! Blob store contract.
//!
//! The blob store is durable byte storage keyed by an opaque [`BlobKey`].
//! The trait is defined here in `stashbox-core` and implemented in
//! `stashbox-storage`. The metadata service only relies on this narrow
//! contract; byte-level engine internals are out of scope.

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::BlobKey;

/// Handle to bytes written to the staging area but not yet committed
/// under a final key.
///
/// A staged blob is produced synchronously during an upload request and
/// later either committed into place by an async placement task or
/// discarded on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBlob {
    /// Provider-internal location of the staged bytes.
    pub temp_path: PathBuf,
}

/// Trait for durable blob storage backends.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Write bytes to the staging area and return a handle to them.
    ///
    /// Staging is the synchronous part of an upload: it must fail fast on
    /// I/O errors so the request can report them.
    async fn stage(&self, data: Bytes) -> AppResult<StagedBlob>;

    /// Atomically place a staged blob under its final key.
    async fn commit(&self, staged: &StagedBlob, key: BlobKey) -> AppResult<()>;

    /// Remove a staged blob that will never be committed. Best-effort.
    async fn discard(&self, staged: &StagedBlob);

    /// Copy the bytes stored under `src` to a new blob under `dst`.
    async fn copy(&self, src: BlobKey, dst: BlobKey) -> AppResult<()>;

    /// Delete the blob stored under `key`. Returns `true` if it existed.
    async fn delete(&self, key: BlobKey) -> AppResult<bool>;

    /// Check whether a blob exists under `key`.
    async fn exists(&self, key: BlobKey) -> AppResult<bool>;

    /// Read a blob fully into memory.
    async fn read_bytes(&self, key: BlobKey) -> AppResult<Bytes>;

    /// Remove staged blobs last written before `cutoff`. A staged blob
    /// that old was abandoned (its placement task never ran) and nothing
    /// will commit it. Returns the number removed.
    async fn sweep_staging(&self, cutoff: SystemTime) -> AppResult<u64>;
}
