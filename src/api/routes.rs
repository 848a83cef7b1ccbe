use axum::{
    extract::DefaultBodyLimit,
    routing::{any, delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Service
        .route("/", any(handlers::index))
        .route("/index.html", any(handlers::index))
        .route("/index.htm", any(handlers::index))
        // Items
        .route(
            "/upload",
            post(handlers::upload_item)
                .fallback(handlers::method_not_allowed)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/delete",
            delete(handlers::delete_item).fallback(handlers::method_not_allowed),
        )
        .route(
            "/list",
            get(handlers::list_items).fallback(handlers::method_not_allowed),
        )
        .route(
            "/item",
            get(handlers::get_item).fallback(handlers::method_not_allowed),
        )
        // Blob content
        .route(
            "/images/*path",
            get(handlers::serve_blob).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
