//! Producer
//!
//! Creates the job record, then publishes the dispatch entry. A failure
//! between the two leaves a pending record with no entry; the caller is told
//! which job was recorded so it can report it.

use archiver_core::domain::job::Job;
use archiver_core::domain::options::CrawlOptions;
use uuid::Uuid;

use crate::entry::DispatchEntry;
use crate::error::{EnqueueError, StoreError};
use crate::keys::STREAM_NAME;
use crate::repository;
use crate::store::Store;

/// Records a pending job and appends its dispatch entry
///
/// # Returns
/// The new job ID on success
pub async fn enqueue(
    store: &dyn Store,
    target_url: &str,
    options: CrawlOptions,
) -> Result<Uuid, EnqueueError> {
    let job = Job::new_pending(target_url, options.clone());

    let entry = DispatchEntry::new(job.id, &job.url, &options)
        .map_err(|e| EnqueueError::Record(StoreError::from(e)))?;

    repository::create(store, &job)
        .await
        .map_err(EnqueueError::Record)?;

    let entry_id = store
        .append(STREAM_NAME, &entry.to_fields())
        .await
        .map_err(|source| EnqueueError::Dispatch {
            job_id: job.id,
            source,
        })?;

    tracing::info!("Queued job {} for {} as entry {}", job.id, job.url, entry_id);

    Ok(job.id)
}
