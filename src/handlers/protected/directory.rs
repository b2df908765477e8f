use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::directory::{DirectoryService, EntryChanges, NewEntry};
use crate::services::users::UserService;

/// POST /api/rappers - admin direct create, bypassing moderation.
/// Coordinates must be supplied explicitly; there is no geocoding here.
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    Json(entry): Json<NewEntry>,
) -> Result<impl IntoResponse, ApiError> {
    UserService::new().await?.ensure_user(&auth).await?;
    let service = DirectoryService::new().await?;
    let created = service.create(entry, &auth.subject).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": created,
            "message": "Directory entry created"
        })),
    ))
}

/// PUT /api/rappers/:id - update an entry (submitter or admin)
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(changes): Json<EntryChanges>,
) -> Result<impl IntoResponse, ApiError> {
    UserService::new().await?.ensure_user(&auth).await?;
    let service = DirectoryService::new().await?;
    let updated = service.update(id, changes, &auth.subject).await?;
    Ok(Json(json!({
        "success": true,
        "data": updated,
        "message": "Directory entry updated"
    })))
}

/// DELETE /api/rappers/:id - remove an entry (submitter or admin)
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    UserService::new().await?.ensure_user(&auth).await?;
    let service = DirectoryService::new().await?;
    service.delete(id, &auth.subject).await?;
    Ok(Json(json!({ "success": true, "message": "Directory entry deleted" })))
}
