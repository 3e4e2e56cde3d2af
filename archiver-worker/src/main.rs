//! Archiver Worker
//!
//! A stateless worker that consumes crawl jobs from the Redis work stream.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Services: Crawler invocation and archive hand-off
//! - Consumer: The queue's consumer-group loop drives each job to a
//!   terminal status and acknowledges it
//!
//! On SIGINT/SIGTERM the worker stops reading new work but finishes the job
//! it is currently running.

mod config;
mod service;

use anyhow::{Context, Result};
use archiver_queue::{Backoff, Consumer, Processor, RedisStore, ShutdownCoordinator, Store};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::service::CommandCrawlService;

const CONNECT_ATTEMPTS: u32 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "archiver_worker=info,archiver_queue=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Archiver Worker");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    info!(
        "Loaded configuration: consumer={}, archives_dir={}",
        config.consumer_name,
        config.archives_dir.display()
    );

    let shutdown = ShutdownCoordinator::new();
    let _signals = shutdown.listen_for_signals();

    info!("Connecting to Redis");
    let store = RedisStore::connect_with_retry(
        &config.redis_url,
        CONNECT_ATTEMPTS,
        Backoff::new(config.retry_initial, config.retry_max),
    )
    .await
    .context("Failed to connect to Redis")?;

    let store: Arc<dyn Store> = Arc::new(store);
    let processor: Arc<dyn Processor> = Arc::new(CommandCrawlService::new(&config));

    let consumer = Consumer::new(store, processor, config.consumer_config());

    info!(
        "Worker initialized (batch size: {}, block timeout: {:?})",
        config.batch_size, config.block_timeout
    );

    consumer.run(shutdown.token()).await;

    info!("Worker stopped gracefully");
    Ok(())
}
