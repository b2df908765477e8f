use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::services::blogs::BlogService;

/// GET /blogs - published articles, newest first
pub async fn list() -> Result<impl IntoResponse, ApiError> {
    let service = BlogService::new().await?;
    let blogs = service.list_published().await?;
    Ok(Json(json!({ "success": true, "data": blogs })))
}

/// GET /blogs/:slug - single published article by slug
pub async fn get(Path(slug): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let service = BlogService::new().await?;
    let blog = service.get_by_slug(&slug).await?;
    Ok(Json(json!({ "success": true, "data": blog })))
}
