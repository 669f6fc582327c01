//! Blob storage configuration.

use serde::{Deserialize, Serialize};

/// Blob store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStorageConfig {
    /// Root directory for stored blobs. Staged uploads live in a `.tmp`
    /// subdirectory of this root so the final placement is a same-device
    /// atomic rename.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            max_upload_size_bytes: default_max_upload(),
        }
    }
}

fn default_root_path() -> String {
    "./data/blobs".to_string()
}

fn default_max_upload() -> u64 {
    1_073_741_824 // 1 GB
}
