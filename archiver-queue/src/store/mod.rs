//! Store layer
//!
//! The store holds job records, the job index and the work stream. It is the
//! only state shared between the API and the workers, and it is passed around
//! as an injected `Arc<dyn Store>` handle.
//!
//! - `RedisStore`: production implementation (hashes, a set, a stream with a
//!   consumer group)
//! - `MemoryStore`: in-process implementation with the same consumer-group
//!   semantics, used by tests

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// A message delivered from the work stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Stream entry ID (e.g. `1700000000000-0`)
    pub id: String,
    /// Raw field values; the worker decodes them into typed entries
    pub fields: HashMap<String, Vec<u8>>,
}

impl StreamMessage {
    /// Builds a message from string fields
    pub fn new(id: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        Self {
            id: id.into(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
        }
    }
}

/// Parameters of a consumer-group read
#[derive(Debug, Clone)]
pub struct ReadGroup<'a> {
    pub stream: &'a str,
    pub group: &'a str,
    pub consumer: &'a str,
    /// Maximum number of entries to return
    pub count: usize,
    /// How long to wait for new entries before returning empty
    pub block: Duration,
}

/// Storage operations needed by the queue
#[async_trait]
pub trait Store: Send + Sync {
    /// Writes a new job record and adds its ID to the job index
    ///
    /// Both writes happen atomically.
    async fn insert_job(&self, job_id: &str, fields: &[(&str, String)]) -> Result<()>;

    /// Sets fields on an existing job record
    async fn update_job(&self, job_id: &str, fields: &[(&str, String)]) -> Result<()>;

    /// Returns all fields of a job record (empty when it does not exist)
    async fn job_fields(&self, job_id: &str) -> Result<HashMap<String, String>>;

    /// Returns every job ID in the index
    async fn job_ids(&self) -> Result<Vec<String>>;

    /// Returns the records of several jobs, in the order of `job_ids`
    async fn jobs_fields(&self, job_ids: &[String]) -> Result<Vec<HashMap<String, String>>>;

    /// Creates the consumer group (and the stream if missing)
    ///
    /// Succeeds when the group already exists.
    async fn create_group(&self, stream: &str, group: &str) -> Result<()>;

    /// Appends an entry to a stream and returns its ID
    async fn append(&self, stream: &str, fields: &[(&str, String)]) -> Result<String>;

    /// Reads new entries for a consumer, waiting up to `read.block`
    ///
    /// Returns an empty list when nothing arrived in time. Delivered entries
    /// stay pending for the consumer until acknowledged.
    async fn read_group(&self, read: ReadGroup<'_>) -> Result<Vec<StreamMessage>>;

    /// Returns entries already delivered to this consumer but not yet
    /// acknowledged, oldest first, without waiting
    async fn read_pending(&self, read: ReadGroup<'_>) -> Result<Vec<StreamMessage>>;

    /// Acknowledges a delivered entry, removing it from the pending list
    async fn ack(&self, stream: &str, group: &str, entry_id: &str) -> Result<()>;

    /// Checks that the store answers
    async fn ping(&self) -> Result<()>;
}
