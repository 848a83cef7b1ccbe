use axum::Json;

use crate::api::response::{ApiError, Reply};

pub async fn index() -> Json<Reply<()>> {
    Reply::message("Service running...")
}

/// Fallback for a known route reached with the wrong method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Fallback for paths no route matches.
pub async fn not_found() -> ApiError {
    ApiError::UnknownRoute
}
