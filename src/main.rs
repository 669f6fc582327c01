//! Stashbox server: multi-tenant file storage metadata service.
//!
//! Entry point that wires the crates together: metadata store (memory or
//! PostgreSQL), local blob store, placement workers, sweeper, and the
//! HTTP API, with graceful shutdown.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use stashbox_api::AppState;
use stashbox_core::config::AppConfig;
use stashbox_core::error::AppError;
use stashbox_core::tasks::TaskQueue;
use stashbox_core::traits::blob::BlobStore;
use stashbox_database::{MemoryMetadataStore, MetadataStore, PgMetadataStore};
use stashbox_service::{FileService, FolderService};
use stashbox_storage::LocalBlobStore;
use stashbox_worker::{PlacementExecutor, Sweeper, WorkerPool};

#[tokio::main]
async fn main() {
    let env = std::env::var("STASHBOX_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting stashbox v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    let store = build_store(&config).await?;

    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.storage.root_path).await?);
    tracing::info!(root = %config.storage.root_path, "Blob store initialized");

    let (queue, receiver) = TaskQueue::bounded(config.worker.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let pool = WorkerPool::spawn(
        PlacementExecutor::new(Arc::clone(&store), Arc::clone(&blobs)),
        receiver,
        config.worker.concurrency,
        shutdown_rx.clone(),
    );

    let sweeper_handle = if config.sweeper.enabled {
        let sweeper = Sweeper::new(
            Arc::clone(&store),
            Arc::clone(&blobs),
            config.sweeper.clone(),
        );
        let cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move { sweeper.run(cancel).await }))
    } else {
        tracing::warn!("Sweeper is disabled; stale uploads and soft-deleted data will accumulate");
        None
    };

    let folder_service = FolderService::new(Arc::clone(&store));
    let file_service = FileService::new(Arc::clone(&store), Arc::clone(&blobs), queue);
    let state = AppState::new(Arc::clone(&config), folder_service, file_service);
    let app = stashbox_api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("Stashbox server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown");
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("Waiting for background tasks to finish");
    let drain = std::time::Duration::from_secs(config.worker.shutdown_drain_seconds);
    let _ = tokio::time::timeout(drain, pool.join()).await;
    if let Some(handle) = sweeper_handle {
        let _ = tokio::time::timeout(drain, handle).await;
    }

    tracing::info!("Stashbox server shut down gracefully");
    Ok(())
}

/// Select the metadata store backend from configuration.
async fn build_store(config: &AppConfig) -> Result<Arc<dyn MetadataStore>, AppError> {
    match config.database.backend.as_str() {
        "postgres" => {
            tracing::info!("Connecting to PostgreSQL");
            let pool = stashbox_database::connection::create_pool(&config.database).await?;
            stashbox_database::connection::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");
            Ok(Arc::new(PgMetadataStore::new(pool)))
        }
        "memory" => {
            tracing::warn!("Using the in-memory metadata store; data will not survive restarts");
            Ok(Arc::new(MemoryMetadataStore::new()))
        }
        other => Err(AppError::configuration(format!(
            "Unknown database backend: {other}"
        ))),
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
