//! Error types for the job queue

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the job store and work stream
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis command failed
    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    /// Store could not be reached or refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Failed to serialize a value for storage
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Errors returned by [`crate::producer::enqueue`]
///
/// Any error means the job may or may not be visible; only `Record`
/// guarantees nothing was dispatched.
#[derive(Debug, Error)]
pub enum EnqueueError {
    /// The job record could not be written; nothing was dispatched
    #[error("Failed to write job record: {0}")]
    Record(#[source] StoreError),

    /// The record exists but the dispatch entry could not be appended
    #[error("Job {job_id} recorded but not dispatched: {source}")]
    Dispatch {
        job_id: Uuid,
        #[source]
        source: StoreError,
    },
}

impl EnqueueError {
    /// The ID of a job whose record was written, if any
    pub fn recorded_job_id(&self) -> Option<Uuid> {
        match self {
            Self::Record(_) => None,
            Self::Dispatch { job_id, .. } => Some(*job_id),
        }
    }
}
