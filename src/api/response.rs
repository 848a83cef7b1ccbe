use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::error::Category;

use crate::coordinator::CoordinatorError;

// ============================================================================
// Success envelope
// ============================================================================

/// `{"code":200,"msg":...,"data":...,"url":...}` with absent parts omitted.
#[derive(Debug, Serialize)]
pub struct Reply<T: Serialize> {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Reply<()> {
    pub fn message(msg: impl Into<String>) -> Json<Reply<()>> {
        Json(Reply {
            code: 200,
            msg: Some(msg.into()),
            data: None,
            url: None,
        })
    }
}

impl<T: Serialize> Reply<T> {
    pub fn data(data: T) -> Json<Reply<T>> {
        Json(Reply {
            code: 200,
            msg: None,
            data: Some(data),
            url: None,
        })
    }

    pub fn upload(data: T, url: String) -> Json<Reply<T>> {
        Json(Reply {
            code: 200,
            msg: Some("Upload finished.".to_string()),
            data: Some(data),
            url: Some(url),
        })
    }
}

// ============================================================================
// Error envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub error: String,
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// Handler failure. Application errors travel in-band: HTTP 200 with an
/// `"error"` field. Only a missing blob uses a real 404 status.
#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed,
    Validation(String),
    NotFound(String),
    Io(String),
    Server(String),
    /// No route matched the request path
    UnknownRoute,
    /// `/images/<path>` with nothing behind it
    MissingBlob,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error) = match self {
            ApiError::MethodNotAllowed => (StatusCode::OK, 200, "Error Method.".to_string()),
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Io(msg)
            | ApiError::Server(msg) => (StatusCode::OK, 200, msg),
            ApiError::UnknownRoute => (StatusCode::OK, 404, "404 Not Found.".to_string()),
            ApiError::MissingBlob => (StatusCode::NOT_FOUND, 404, "File not found.".to_string()),
        };
        (status, Json(ErrorBody { code, error })).into_response()
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::Validation(msg) => ApiError::Validation(msg),
            CoordinatorError::NotFound(msg) => ApiError::NotFound(msg),
            CoordinatorError::Io(msg) => ApiError::Io(msg),
            CoordinatorError::Server(msg) => ApiError::Server(msg),
        }
    }
}

// ============================================================================
// Custom extractors (reject with ApiError)
// ============================================================================

/// JSON body extractor that does not insist on a Content-Type header and
/// rejects with `ApiError::Validation`.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::Validation("Failed to read request body".into()))?;

        serde_json::from_slice(&body).map(AppJson).map_err(|e| {
            let message = match e.classify() {
                Category::Data => format!("Invalid request body: {e}"),
                Category::Syntax | Category::Eof => "Malformed JSON in request body".into(),
                Category::Io => "Failed to read request body".into(),
            };
            ApiError::Validation(message)
        })
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with `ApiError`.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::Validation(friendly_query_error(&e.to_string())))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameter: {cleaned}")
}
