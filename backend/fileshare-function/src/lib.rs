//! HTTP function that forwards a multipart file upload to a remote file share.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod storage;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::{ServerConfig, StorageBackend, StorageConfig};
use crate::models::UploadTarget;
use crate::storage::azure_files::AzureFilesConnector;
use crate::storage::memory::MemoryFileShare;
use crate::storage::{ShareConnector, SharedStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn ShareConnector>,
    pub target: UploadTarget,
}

impl AppState {
    pub fn new(connector: Arc<dyn ShareConnector>, target: UploadTarget) -> Self {
        Self { connector, target }
    }

    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let connector: Arc<dyn ShareConnector> = match config.backend {
            StorageBackend::Azure => Arc::new(AzureFilesConnector::new(config)?),
            StorageBackend::Memory => {
                warn!("Using in-memory file share; uploaded files are lost on restart");
                let store = MemoryFileShare::with_directory(&config.share_name, &config.directory);
                Arc::new(SharedStore::new(Arc::new(store)))
            }
        };

        Ok(Self::new(connector, UploadTarget::from(config)))
    }
}

/// Build the router: the upload route (GET and POST) plus `/health`.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            &server.route,
            get(handlers::file_upload::upload_file).post(handlers::file_upload::upload_file),
        )
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
