use axum::{
    extract::Path,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::moderation::ModerationService;
use crate::services::users::UserService;

/// GET /api/requests - admin-only list of all requests, newest first
pub async fn list(Extension(auth): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    ensure_known(&auth).await?;
    let service = ModerationService::new().await?;
    let requests = service.list_all(&auth.subject).await?;
    Ok(Json(json!({ "success": true, "data": requests })))
}

/// POST /api/requests/:id/approve - promote a pending request into the
/// public directory
pub async fn approve(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_known(&auth).await?;
    let service = ModerationService::new().await?;
    let entry = service.approve(id, &auth.subject).await?;
    Ok(Json(json!({
        "success": true,
        "data": entry,
        "message": "Request approved and added to the directory"
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RejectBody {
    pub rejection_reason: Option<String>,
}

/// POST /api/requests/:id/reject - reject a pending request
pub async fn reject(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectBody>>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_known(&auth).await?;
    let reason = body.and_then(|Json(b)| b.rejection_reason);
    let service = ModerationService::new().await?;
    service.reject(id, &auth.subject, reason).await?;
    Ok(Json(json!({ "success": true, "message": "Request rejected" })))
}

/// First-contact provisioning: make sure the authenticated subject has a
/// user record before the policy layer resolves it.
async fn ensure_known(auth: &AuthUser) -> Result<(), ApiError> {
    let users = UserService::new().await?;
    users.ensure_user(auth).await?;
    Ok(())
}
