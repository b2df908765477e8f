use axum::{response::IntoResponse, Extension, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::users::UserService;

/// GET /api/auth/whoami - the caller's profile record
///
/// Also the lazy repair point for the primary admin: reading the profile
/// normalizes the configured primary-admin email back to the admin role.
pub async fn whoami(Extension(auth): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = UserService::new().await?;
    let user = service.profile(&auth).await?;
    Ok(Json(json!({ "success": true, "data": user })))
}
