//! Archive API Handlers
//!
//! Listing, download, deletion and renaming of finished archives.

use archiver_core::dto::archive::{ArchiveList, RenameArchive};
use axum::{
    Json,
    body::Body,
    extract::{Path, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::archive_service;

/// GET /api/archives
/// List available archives
pub async fn list_archives(State(state): State<AppState>) -> ApiResult<Json<ArchiveList>> {
    let archives = archive_service::list_archives(&state.archives_dir).await?;
    Ok(Json(ArchiveList { archives }))
}

/// GET /api/archives/{name}
/// Download an archive
///
/// The file is streamed from disk and honors `Range` requests, which the
/// replay viewer relies on.
pub async fn download_archive(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let path = archive_service::locate_archive(&state.archives_dir, &name).await?;

    let response = ServeFile::new(path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    let mut response = response.map(Body::new);
    if let Ok(disposition) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name)) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response)
}

/// DELETE /api/archives/{name}
/// Delete an archive
pub async fn delete_archive(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    archive_service::delete_archive(&state.archives_dir, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/archives/{name}
/// Rename an archive
pub async fn rename_archive(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<RenameArchive>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = payload.map_err(|_| ApiError::BadRequest("Bad request".to_string()))?;

    archive_service::rename_archive(&state.archives_dir, &name, &req.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{empty_request, json_request, send};
    use crate::api::{AppState, create_router};
    use archiver_queue::MemoryStore;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(dir: &Path) -> axum::Router {
        create_router(AppState::new(Arc::new(MemoryStore::new()), dir))
    }

    fn write(dir: &Path, name: &str, content: &[u8]) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_list_archives() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "archive1.wacz", b"");
        write(dir.path(), "archive2.wacz", b"");
        write(dir.path(), "ignored.txt", b"");

        let (status, body) = send(app(dir.path()), empty_request("GET", "/api/archives")).await;
        assert_eq!(status, StatusCode::OK);

        let response: Value = serde_json::from_slice(&body).unwrap();
        let names: Vec<&str> = response["archives"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["archive1.wacz", "archive2.wacz"]);
    }

    #[tokio::test]
    async fn test_download_archive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "test.wacz", b"dummy wacz content");

        let (status, body) = send(app(dir.path()), empty_request("GET", "/api/archives/test.wacz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"dummy wacz content");

        let (status, _) = send(
            app(dir.path()),
            empty_request("GET", "/api/archives/nonexistent.wacz"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_serves_byte_ranges() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "test.wacz", b"dummy wacz content");

        let request = Request::builder()
            .method("GET")
            .uri("/api/archives/test.wacz")
            .header(header::RANGE, "bytes=0-3")
            .body(Body::empty())
            .unwrap();
        let response = app(dir.path()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers()[header::CONTENT_RANGE],
            "bytes 0-3/18"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"test.wacz\""
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"dumm");
    }

    #[tokio::test]
    async fn test_download_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = send(
            app(dir.path()),
            empty_request("GET", "/api/archives/..%2Fsecret.wacz"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_archive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "to_delete.wacz", b"content");

        let (status, _) = send(
            app(dir.path()),
            empty_request("DELETE", "/api/archives/to_delete.wacz"),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!dir.path().join("to_delete.wacz").exists());

        let (status, _) = send(
            app(dir.path()),
            empty_request("DELETE", "/api/archives/non_existent.wacz"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rename_archive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "old.wacz", b"content");

        let (status, _) = send(
            app(dir.path()),
            json_request("PUT", "/api/archives/old.wacz", r#"{"name":"new"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!dir.path().join("old.wacz").exists());
        assert!(dir.path().join("new.wacz").exists());
    }

    #[tokio::test]
    async fn test_rename_sanitizes_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "san.wacz", b"content");

        let (status, _) = send(
            app(dir.path()),
            json_request("PUT", "/api/archives/san.wacz", r#"{"name":"my new name"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(dir.path().join("my-new-name.wacz").exists());
    }

    #[tokio::test]
    async fn test_rename_conflict() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "source.wacz", b"content");
        write(dir.path(), "existing.wacz", b"content");

        let (status, _) = send(
            app(dir.path()),
            json_request("PUT", "/api/archives/source.wacz", r#"{"name":"existing.wacz"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(dir.path().join("source.wacz").exists());
    }

    #[tokio::test]
    async fn test_rename_missing_archive() {
        let dir = tempfile::tempdir().unwrap();

        let (status, _) = send(
            app(dir.path()),
            json_request(
                "PUT",
                "/api/archives/missing.wacz",
                r#"{"name":"really-missing.wacz"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
