//! Job DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::JobStatus;
use crate::domain::options::CrawlOptions;

/// Request to crawl a URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    #[serde(default)]
    pub crawl_options: CrawlOptions,
}

/// Response to an accepted crawl request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}
