//! API Module
//!
//! HTTP API layer for the archiver.
//! Each submodule handles endpoints for a specific domain.

pub mod archive;
pub mod error;
pub mod health;
pub mod job;

use archiver_queue::Store;
use axum::{
    Router,
    routing::get,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub archives_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, archives_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            archives_dir: Arc::new(archives_dir.into()),
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/api/jobs", get(job::list_jobs).post(job::create_job))
        .route("/api/jobs/{id}", get(job::get_job))
        // Archive endpoints
        .route("/api/archives", get(archive::list_archives))
        .route(
            "/api/archives/{name}",
            get(archive::download_archive)
                .delete(archive::delete_archive)
                .put(archive::rename_archive),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
