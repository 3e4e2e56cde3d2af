//! Job Repository
//!
//! Reads and writes job records. Records are only ever written by the
//! producer (creation) and by the worker that claimed the job (status).

use archiver_core::domain::job::{Job, JobStatus, fields, format_timestamp};
use chrono::Utc;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;

/// Persist a new job record and index it
pub async fn create(store: &dyn Store, job: &Job) -> Result<()> {
    store.insert_job(&job.id.to_string(), &job.to_record()).await
}

/// Find a job by ID
///
/// Returns `None` when the record is missing or unparsable.
pub async fn find_by_id(store: &dyn Store, id: Uuid) -> Result<Option<Job>> {
    let id = id.to_string();
    let record = store.job_fields(&id).await?;

    Ok(Job::from_record(&id, &record))
}

/// What a worker finds when it loads the record for a dispatched job
#[derive(Debug)]
pub enum RecordLookup {
    /// No record under the job's key
    Missing,
    /// Record parsed
    Found(Job),
    /// Record exists but does not parse; carries the status field if that
    /// one is readable on its own
    Unreadable(Option<JobStatus>),
}

/// Load a job record, telling a missing record apart from a broken one
pub async fn lookup(store: &dyn Store, id: Uuid) -> Result<RecordLookup> {
    let key = id.to_string();
    let record = store.job_fields(&key).await?;

    if record.is_empty() {
        return Ok(RecordLookup::Missing);
    }

    Ok(match Job::from_record(&key, &record) {
        Some(job) => RecordLookup::Found(job),
        None => RecordLookup::Unreadable(
            record
                .get(fields::STATUS)
                .and_then(|status| JobStatus::from_str(status).ok()),
        ),
    })
}

/// List every job reachable through the job index, newest first
///
/// Records that are missing or cannot be parsed are skipped.
pub async fn list_all(store: &dyn Store) -> Result<Vec<Job>> {
    let ids = store.job_ids().await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let records = store.jobs_fields(&ids).await?;

    let mut jobs: Vec<Job> = ids
        .iter()
        .zip(records.iter())
        .filter_map(|(id, record)| {
            let job = Job::from_record(id, record);
            if job.is_none() {
                tracing::debug!("Skipping unreadable job record {}", id);
            }
            job
        })
        .collect();

    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(jobs)
}

/// Mark a job as running
pub async fn mark_running(store: &dyn Store, id: Uuid) -> Result<()> {
    store
        .update_job(
            &id.to_string(),
            &[
                (fields::STATUS, JobStatus::Running.to_string()),
                (fields::STARTED_AT, format_timestamp(Utc::now())),
            ],
        )
        .await
}

/// Mark a job as completed
pub async fn mark_completed(store: &dyn Store, id: Uuid) -> Result<()> {
    store
        .update_job(
            &id.to_string(),
            &[
                (fields::STATUS, JobStatus::Completed.to_string()),
                (fields::FINISHED_AT, format_timestamp(Utc::now())),
            ],
        )
        .await
}

/// Mark a job as failed with the error that caused it
pub async fn mark_failed(store: &dyn Store, id: Uuid, error: &str) -> Result<()> {
    store
        .update_job(
            &id.to_string(),
            &[
                (fields::STATUS, JobStatus::Failed.to_string()),
                (fields::ERROR, error.to_string()),
                (fields::FINISHED_AT, format_timestamp(Utc::now())),
            ],
        )
        .await
}
