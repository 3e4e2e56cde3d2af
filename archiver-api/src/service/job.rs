//! Job Service
//!
//! Admission and status queries for crawl jobs.

use archiver_core::domain::job::{Job, JobStatus};
use archiver_core::dto::job::{CrawlRequest, EnqueueResponse};
use archiver_queue::error::{EnqueueError, StoreError};
use archiver_queue::{Store, producer, repository};
use uuid::Uuid;

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(Uuid),
    ValidationError(String),
    EnqueueError(EnqueueError),
    StoreError(StoreError),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        JobError::StoreError(err)
    }
}

/// Validate a crawl request and queue it
pub async fn enqueue_job(store: &dyn Store, req: CrawlRequest) -> Result<EnqueueResponse, JobError> {
    let url = validate_url(&req.url)?;

    let job_id = producer::enqueue(store, url, req.crawl_options)
        .await
        .map_err(JobError::EnqueueError)?;

    Ok(EnqueueResponse {
        job_id,
        status: JobStatus::Pending,
    })
}

/// Get a job by ID
pub async fn get_job(store: &dyn Store, id: Uuid) -> Result<Job, JobError> {
    repository::find_by_id(store, id)
        .await?
        .ok_or(JobError::NotFound(id))
}

/// List all jobs, newest first
pub async fn list_all_jobs(store: &dyn Store) -> Result<Vec<Job>, JobError> {
    let jobs = repository::list_all(store).await?;
    Ok(jobs)
}

fn validate_url(url: &str) -> Result<&str, JobError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(JobError::ValidationError("url is required".to_string()));
    }

    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));

    match rest {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(JobError::ValidationError(format!(
            "url must be an http(s) URL: {}",
            url
        ))),
    }
}
