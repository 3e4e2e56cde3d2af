//! Job API Handlers
//!
//! HTTP endpoints for submitting crawl jobs and querying their status.

use archiver_core::domain::job::Job;
use archiver_core::dto::job::{CrawlRequest, EnqueueResponse};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::job_service;

/// POST /api/jobs
/// Queue a new crawl job
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<CrawlRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EnqueueResponse>)> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!("Rejected job request: {}", e.body_text());
        ApiError::BadRequest("Bad request".to_string())
    })?;

    tracing::info!("Queueing crawl of {}", req.url);

    let response = job_service::enqueue_job(state.store.as_ref(), req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/jobs
/// List all jobs, newest first
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing all jobs");

    let jobs = job_service::list_all_jobs(state.store.as_ref()).await?;

    Ok(Json(jobs))
}

/// GET /api/jobs/{id}
/// Get job details by ID
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(state.store.as_ref(), id).await?;

    Ok(Json(job))
}
