//! Worker configuration
//!
//! Defines all configurable parameters for the worker: Redis connection,
//! stream consumption, retry backoff and crawler invocation.

use anyhow::Context;
use archiver_queue::ConsumerConfig;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_CRAWLER_COMMAND: &str = "node /app/dist/main.js crawl";

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL
    pub redis_url: String,

    /// Consumer name within the group; unique per process
    pub consumer_name: String,

    /// Maximum entries read per iteration
    pub batch_size: usize,

    /// How long a read waits for new entries
    pub block_timeout: Duration,

    /// First delay after a failed store operation
    pub retry_initial: Duration,

    /// Upper bound for the retry delay
    pub retry_max: Duration,

    /// Directory finished archives are copied into
    pub archives_dir: PathBuf,

    /// Working directory of the crawler; collections are written below it
    pub crawl_workdir: PathBuf,

    /// Crawler program followed by its leading arguments
    pub crawler_command: Vec<String>,

    /// Parallel browser workers per crawl
    pub crawler_workers: u32,

    /// Per-page timeout handed to the crawler, in seconds
    pub page_timeout_secs: u64,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(consumer_name: String) -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            consumer_name,
            batch_size: 1,
            block_timeout: Duration::from_millis(1000),
            retry_initial: Duration::from_millis(500),
            retry_max: Duration::from_millis(30_000),
            archives_dir: PathBuf::from("./archives"),
            crawl_workdir: PathBuf::from("."),
            crawler_command: split_command(DEFAULT_CRAWLER_COMMAND),
            crawler_workers: 2,
            page_timeout_secs: 30,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - REDIS_URL (default: redis://127.0.0.1:6379)
    /// - WORKER_CONSUMER_NAME (default: worker-<hostname>-<pid>)
    /// - WORKER_BATCH_SIZE (default: 1)
    /// - WORKER_BLOCK_MS (default: 1000)
    /// - WORKER_RETRY_INITIAL_MS (default: 500)
    /// - WORKER_RETRY_MAX_MS (default: 30000)
    /// - ARCHIVES_DIR (default: ./archives)
    /// - CRAWL_WORKDIR (default: .)
    /// - CRAWLER_COMMAND (default: node /app/dist/main.js crawl)
    /// - CRAWLER_WORKERS (default: 2)
    /// - CRAWLER_PAGE_TIMEOUT (seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let consumer_name = var("WORKER_CONSUMER_NAME")
            .unwrap_or_else(|| default_consumer_name(var("HOSTNAME").as_deref()));
        let mut config = Self::new(consumer_name);

        if let Some(url) = var("REDIS_URL") {
            config.redis_url = url;
        }
        if let Some(size) = parse(&var, "WORKER_BATCH_SIZE")? {
            config.batch_size = size;
        }
        if let Some(ms) = parse(&var, "WORKER_BLOCK_MS")? {
            config.block_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(&var, "WORKER_RETRY_INITIAL_MS")? {
            config.retry_initial = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(&var, "WORKER_RETRY_MAX_MS")? {
            config.retry_max = Duration::from_millis(ms);
        }
        if let Some(dir) = var("ARCHIVES_DIR") {
            config.archives_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("CRAWL_WORKDIR") {
            config.crawl_workdir = PathBuf::from(dir);
        }
        if let Some(command) = var("CRAWLER_COMMAND") {
            config.crawler_command = split_command(&command);
        }
        if let Some(workers) = parse(&var, "CRAWLER_WORKERS")? {
            config.crawler_workers = workers;
        }
        if let Some(secs) = parse(&var, "CRAWLER_PAGE_TIMEOUT")? {
            config.page_timeout_secs = secs;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.consumer_name.is_empty() {
            anyhow::bail!("consumer_name cannot be empty");
        }

        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            anyhow::bail!("redis_url must start with redis:// or rediss://");
        }

        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be greater than 0");
        }

        if self.block_timeout.is_zero() {
            anyhow::bail!("block_timeout must be greater than 0");
        }

        if self.retry_initial.is_zero() {
            anyhow::bail!("retry_initial must be greater than 0");
        }

        if self.retry_max < self.retry_initial {
            anyhow::bail!("retry_max must not be smaller than retry_initial");
        }

        if self.crawler_command.is_empty() {
            anyhow::bail!("crawler_command cannot be empty");
        }

        if self.crawler_workers == 0 {
            anyhow::bail!("crawler_workers must be greater than 0");
        }

        Ok(())
    }

    /// Settings for the stream consumer
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            consumer_name: self.consumer_name.clone(),
            batch_size: self.batch_size,
            block_timeout: self.block_timeout,
            retry_initial: self.retry_initial,
            retry_max: self.retry_max,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(default_consumer_name(None))
    }
}

/// `worker-<hostname>-<pid>`, or `worker-<uuid>` when the host is unknown
pub fn default_consumer_name(hostname: Option<&str>) -> String {
    match hostname.map(str::trim).filter(|h| !h.is_empty()) {
        Some(host) => format!("worker-{}-{}", host, std::process::id()),
        None => format!("worker-{}", uuid::Uuid::new_v4()),
    }
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

fn parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> anyhow::Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("Invalid value for {}", key))
}
