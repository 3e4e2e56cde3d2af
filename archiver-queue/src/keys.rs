//! Key and stream names shared by the producer, the worker and the API

/// Work stream carrying dispatch entries
pub const STREAM_NAME: &str = "crawl_stream";

/// Consumer group reading the work stream
pub const GROUP_NAME: &str = "worker_group";

/// Set of every known job ID
pub const JOB_INDEX_KEY: &str = "jobs:index";

const JOB_KEY_PREFIX: &str = "job:";

/// Key of the record hash for a job
pub fn job_key(job_id: &str) -> String {
    format!("{}{}", JOB_KEY_PREFIX, job_id)
}
