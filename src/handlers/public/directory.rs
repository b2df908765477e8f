use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::directory::DirectoryService;

/// GET /rappers - public directory listing (active entries only)
pub async fn list() -> Result<impl IntoResponse, ApiError> {
    let service = DirectoryService::new().await?;
    let entries = service.list_active().await?;
    Ok(Json(json!({ "success": true, "data": entries })))
}

/// GET /rappers/:id - single directory entry
pub async fn get(Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    let service = DirectoryService::new().await?;
    let entry = service.get(id).await?;
    Ok(Json(json!({ "success": true, "data": entry })))
}
