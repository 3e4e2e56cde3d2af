//! Archiver API
//!
//! HTTP control plane: accepts crawl requests, reports job status and
//! manages the archive directory. Jobs are handed to workers through the
//! Redis work stream; this process never runs crawls itself.

use anyhow::{Context, Result};
use archiver_queue::keys::{GROUP_NAME, STREAM_NAME};
use archiver_queue::{Backoff, RedisStore, ShutdownCoordinator, Store};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod service;

use crate::config::Config;

const CONNECT_ATTEMPTS: u32 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "archiver_api=debug,archiver_queue=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Archiver API...");

    let config = Config::from_env();

    tracing::info!("Connecting to Redis...");

    let store = RedisStore::connect_with_retry(&config.redis_url, CONNECT_ATTEMPTS, Backoff::default())
        .await
        .context("Failed to connect to Redis")?;

    // Workers create the group too; whoever comes first wins
    if let Err(e) = store.create_group(STREAM_NAME, GROUP_NAME).await {
        tracing::warn!("Failed to create consumer group: {}", e);
    }

    let shutdown = ShutdownCoordinator::new();
    let _signals = shutdown.listen_for_signals();

    // Build router with all API endpoints
    let state = api::AppState::new(Arc::new(store), config.archives_dir.clone());
    let app = api::create_router(state);

    tracing::info!("Serving archives from {}", config.archives_dir.display());
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    let token = shutdown.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("Server error")?;

    tracing::info!("Server stopped gracefully");
    Ok(())
}
