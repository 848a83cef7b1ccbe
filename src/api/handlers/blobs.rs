use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::coordinator::CoordinatorError;
use crate::AppState;

/// Serve blob bytes by their storage path.
/// Route: GET /images/*path
pub async fn serve_blob(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    // A path that does not decode cannot name a stored blob
    let Path(path) = path.map_err(|_| ApiError::MissingBlob)?;

    let data = state
        .coordinator
        .read_blob(&path)
        .await
        .map_err(|e| match e {
            CoordinatorError::NotFound(_) => ApiError::MissingBlob,
            e => ApiError::from(e),
        })?;

    let content_type = mime_guess::from_path(&path).first_or_octet_stream();
    let byte_size = data.len() as u64;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        content_type
            .as_ref()
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(byte_size));

    // Blobs never change once written
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
