//! Health Check API Handler
//!
//! Reports whether the job store answers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::api::AppState;

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{empty_request, send};
    use crate::api::{AppState, create_router};
    use archiver_queue::MemoryStore;
    use axum::http::StatusCode;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_ok() {
        let app = create_router(AppState::new(Arc::new(MemoryStore::new()), "."));
        let (status, body) = send(app, empty_request("GET", "/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }
}
