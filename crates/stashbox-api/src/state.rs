//! Application state shared across all handlers.

use std::sync::Arc;

use stashbox_core::config::AppConfig;
use stashbox_service::{FileService, FolderService};

/// Everything a handler needs, cloned per request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub folder_service: FolderService,
    pub file_service: FileService,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        folder_service: FolderService,
        file_service: FileService,
    ) -> Self {
        Self {
            config,
            folder_service,
            file_service,
        }
    }
}
