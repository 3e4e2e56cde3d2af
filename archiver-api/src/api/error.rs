//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use archiver_queue::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::{archive_service::ArchiveError, job_service::JobError};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    StoreError(StoreError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::StoreError(err) => {
                tracing::error!("Store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::StoreError(err)
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => ApiError::NotFound(format!("Job {} not found", id)),
            JobError::ValidationError(msg) => ApiError::BadRequest(msg),
            JobError::EnqueueError(err) => {
                match err.recorded_job_id() {
                    Some(id) => tracing::error!("Job {} recorded but not dispatched: {}", id, err),
                    None => tracing::error!("Failed to record job: {}", err),
                }
                ApiError::InternalError("Failed to queue job".to_string())
            }
            JobError::StoreError(err) => ApiError::StoreError(err),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound(name) => ApiError::NotFound(format!("Archive {} not found", name)),
            ArchiveError::InvalidName(name) => {
                ApiError::BadRequest(format!("Invalid archive name: {}", name))
            }
            ArchiveError::AlreadyExists(name) => {
                ApiError::Conflict(format!("Archive {} already exists", name))
            }
            ArchiveError::Io(err) => {
                tracing::error!("Archive I/O error: {}", err);
                ApiError::InternalError("Internal server error".to_string())
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
