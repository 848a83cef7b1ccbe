use axum::extract::{Multipart, State};
use axum::Json;
use futures::TryStreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::StreamReader;

use crate::api::response::{ApiError, AppJson, AppQuery, Reply};
use crate::storage::models::{ItemRecord, KeyMapEntry};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: i64,
}

#[derive(Debug, Deserialize)]
pub struct ItemParams {
    #[serde(rename = "UUID")]
    pub id: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_item(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Reply<ItemRecord>>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "Invalid multipart data");
        ApiError::Validation("Get form file failed.".to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !state.config.is_allowed_file_type(&filename) {
            return Err(ApiError::Validation("Invalid file type.".to_string()));
        }

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        tokio::pin!(reader);

        let upload = state.coordinator.upload(&filename, &mut reader).await?;
        return Ok(Reply::upload(upload.item, upload.url));
    }

    Err(ApiError::Validation("Get form file failed.".to_string()))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<DeleteRequest>,
) -> Result<Json<Reply<()>>, ApiError> {
    let key = req.key.trim();
    if key.is_empty() {
        return Err(ApiError::Validation("key must not be empty".to_string()));
    }

    state.coordinator.delete(key).await?;
    Ok(Reply::message("Delete finished."))
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    params: Result<AppQuery<ListParams>, ApiError>,
) -> Result<Json<Reply<Vec<KeyMapEntry>>>, ApiError> {
    let AppQuery(params) = params.map_err(|_| ApiError::Validation("Error parm.".to_string()))?;
    Ok(Reply::data(state.coordinator.list(params.page)))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    params: Result<AppQuery<ItemParams>, ApiError>,
) -> Result<Json<Reply<ItemRecord>>, ApiError> {
    let AppQuery(params) = params.map_err(|_| ApiError::Validation("Error parm.".to_string()))?;
    let item = state.coordinator.item(&params.id)?;
    Ok(Reply::data(item))
}
