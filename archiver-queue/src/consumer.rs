//! Worker loop
//!
//! Reads dispatch entries from the work stream through the consumer group,
//! drives each job through `running` to a terminal status, and acknowledges
//! the entry afterwards. Delivery is at-least-once: an entry is only
//! acknowledged once its job record is terminal (or the entry is unusable).
//!
//! An entry left unresolved after its retries stays in this consumer's
//! pending list and is replayed from there before new entries are read.
//!
//! Cancellation is checked between iterations only. A job that was claimed
//! runs to completion even when shutdown fires while it is executing.

use archiver_core::domain::options::{CrawlOptions, CrawlSettings};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backoff::{Backoff, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY};
use crate::entry::DispatchEntry;
use crate::keys::{GROUP_NAME, STREAM_NAME};
use crate::repository::{self, RecordLookup};
use crate::store::{ReadGroup, Store, StreamMessage};

/// Attempts made for a record read, a status write or an acknowledgment
/// before giving up
const MAX_STORE_ATTEMPTS: u32 = 5;

/// Runs the actual work of a job
#[async_trait]
pub trait Processor: Send + Sync {
    /// Processes one job; an error marks the job failed
    async fn process(
        &self,
        job_id: Uuid,
        target_url: &str,
        settings: &CrawlSettings,
    ) -> anyhow::Result<()>;
}

/// Consumer settings
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Unique consumer name within the group
    pub consumer_name: String,
    /// Maximum entries per read
    pub batch_size: usize,
    /// How long one read waits for new entries
    pub block_timeout: Duration,
    /// First delay after a failed store operation
    pub retry_initial: Duration,
    /// Upper bound for the retry delay
    pub retry_max: Duration,
}

impl ConsumerConfig {
    pub fn new(consumer_name: impl Into<String>) -> Self {
        Self {
            consumer_name: consumer_name.into(),
            batch_size: 1,
            block_timeout: Duration::from_secs(1),
            retry_initial: DEFAULT_INITIAL_DELAY,
            retry_max: DEFAULT_MAX_DELAY,
        }
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(self.retry_initial, self.retry_max)
    }
}

/// What happened to one delivered entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Job ran and was marked completed
    Completed,
    /// Job ran (or could not run) and was marked failed
    Failed,
    /// Entry could not be decoded and was dropped
    Discarded,
    /// Job record missing or already terminal; entry acknowledged untouched
    Skipped,
    /// A store operation kept failing; the entry stays pending
    Unresolved,
}

/// Consumer-group worker
pub struct Consumer {
    store: Arc<dyn Store>,
    processor: Arc<dyn Processor>,
    config: ConsumerConfig,
}

impl Consumer {
    pub fn new(store: Arc<dyn Store>, processor: Arc<dyn Processor>, config: ConsumerConfig) -> Self {
        Self {
            store,
            processor,
            config,
        }
    }

    /// Runs the poll loop until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Worker {} consuming {} as part of {}",
            self.config.consumer_name, STREAM_NAME, GROUP_NAME
        );

        let mut backoff = self.config.backoff();
        let mut retry_backoff = self.config.backoff();
        let mut group_ready = self.ensure_group().await;
        // Set while entries this consumer could not resolve sit in its pending list
        let mut replay_pending = false;

        loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested, worker {} stopping", self.config.consumer_name);
                return;
            }

            if !group_ready {
                group_ready = self.ensure_group().await;
            }

            let read = ReadGroup {
                stream: STREAM_NAME,
                group: GROUP_NAME,
                consumer: &self.config.consumer_name,
                count: self.config.batch_size,
                block: self.config.block_timeout,
            };

            let result = if replay_pending {
                self.store.read_pending(read).await
            } else {
                self.store.read_group(read).await
            };

            let messages = match result {
                Ok(messages) => {
                    backoff.reset();
                    messages
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    error!("Failed to read from {}: {} (retrying in {:?})", STREAM_NAME, e, delay);
                    group_ready = false;

                    if !Self::pause(&shutdown, delay).await {
                        info!("Shutdown requested during backoff, worker stopping");
                        return;
                    }
                    continue;
                }
            };

            if replay_pending && messages.is_empty() {
                debug!("Pending list drained, back to new entries");
                replay_pending = false;
                retry_backoff.reset();
                continue;
            }

            // Everything read here is already claimed, so the whole batch runs
            let mut unresolved = false;
            for message in &messages {
                if self.handle(message).await == Outcome::Unresolved {
                    unresolved = true;
                }
            }

            if unresolved {
                replay_pending = true;
                let delay = retry_backoff.next_delay();
                warn!("Entries left pending, retrying them in {:?}", delay);

                if !Self::pause(&shutdown, delay).await {
                    info!("Shutdown requested during backoff, worker stopping");
                    return;
                }
            }
        }
    }

    /// Sleeps for `delay`; returns false when shutdown fired first
    async fn pause(shutdown: &CancellationToken, delay: Duration) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    async fn ensure_group(&self) -> bool {
        match self.store.create_group(STREAM_NAME, GROUP_NAME).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to create consumer group {}: {}", GROUP_NAME, e);
                false
            }
        }
    }

    /// Processes one delivered entry end to end
    pub async fn handle(&self, message: &StreamMessage) -> Outcome {
        let entry = match DispatchEntry::decode(message) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(entry_id = %message.id, "Discarding malformed entry: {}", e);
                return self.finish(&message.id, Outcome::Discarded).await;
            }
        };

        let job_id = entry.job_id;
        let options = entry.crawl_options().unwrap_or_else(|e| {
            warn!(job_id = %job_id, "Unreadable crawl options, using defaults: {}", e);
            CrawlOptions::default()
        });

        let store = self.store.as_ref();

        let record = match self
            .with_retries("load job record", || repository::lookup(store, job_id))
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!(job_id = %job_id, "Could not load job record, leaving entry pending: {}", e);
                return Outcome::Unresolved;
            }
        };

        match record {
            RecordLookup::Missing => {
                warn!(job_id = %job_id, "No job record for entry {}, skipping", message.id);
                return self.finish(&message.id, Outcome::Skipped).await;
            }
            RecordLookup::Found(job) if job.status.is_terminal() => {
                info!(job_id = %job_id, "Job already {}, skipping", job.status);
                return self.finish(&message.id, Outcome::Skipped).await;
            }
            RecordLookup::Unreadable(Some(status)) if status.is_terminal() => {
                warn!(job_id = %job_id, "Job record unreadable but already {}, skipping", status);
                return self.finish(&message.id, Outcome::Skipped).await;
            }
            RecordLookup::Unreadable(_) => {
                warn!(job_id = %job_id, "Job record for entry {} is unreadable, running anyway", message.id);
            }
            RecordLookup::Found(_) => {}
        }

        if let Err(e) = self
            .with_retries("mark running", || repository::mark_running(store, job_id))
            .await
        {
            error!(job_id = %job_id, "Could not mark job running: {}", e);
            return Outcome::Unresolved;
        }

        info!(job_id = %job_id, "Processing {}", entry.target_url);

        let outcome = match self.execute(job_id, entry.target_url.clone(), options).await {
            Ok(()) => {
                info!(job_id = %job_id, "Job completed");
                self.with_retries("mark completed", || repository::mark_completed(store, job_id))
                    .await
                    .map(|()| Outcome::Completed)
            }
            Err(message) => {
                warn!(job_id = %job_id, "Job failed: {}", message);
                let message = message.as_str();
                self.with_retries("mark failed", || repository::mark_failed(store, job_id, message))
                    .await
                    .map(|()| Outcome::Failed)
            }
        };

        match outcome {
            Ok(outcome) => self.finish(&message.id, outcome).await,
            Err(e) => {
                error!(job_id = %job_id, "Could not record terminal status, leaving entry pending: {}", e);
                Outcome::Unresolved
            }
        }
    }

    /// Runs the processor in its own task; returns the error text on failure
    async fn execute(&self, job_id: Uuid, target_url: String, options: CrawlOptions) -> Result<(), String> {
        let processor = Arc::clone(&self.processor);

        let settings = options.normalize();

        let handle = tokio::spawn(async move { processor.process(job_id, &target_url, &settings).await });

        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(e) if e.is_panic() => Err("crawl task panicked".to_string()),
            Err(e) => Err(format!("crawl task aborted: {}", e)),
        }
    }

    /// Acknowledges an entry and passes the outcome through
    async fn finish(&self, entry_id: &str, outcome: Outcome) -> Outcome {
        let store = self.store.as_ref();
        match self
            .with_retries("ack", || store.ack(STREAM_NAME, GROUP_NAME, entry_id))
            .await
        {
            Ok(()) => {
                debug!(entry_id = %entry_id, "Acknowledged");
                outcome
            }
            Err(e) => {
                error!(entry_id = %entry_id, "Failed to acknowledge entry: {}", e);
                Outcome::Unresolved
            }
        }
    }

    async fn with_retries<T, F, Fut>(&self, operation: &str, mut attempt_once: F) -> crate::error::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = crate::error::Result<T>>,
    {
        let mut backoff = self.config.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match attempt_once().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= MAX_STORE_ATTEMPTS => return Err(e),
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation, attempt, MAX_STORE_ATTEMPTS, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
