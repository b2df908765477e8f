use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::policy::AuthorizationPolicy;
use crate::services::users::UserService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChange {
    pub role: String,
}

/// PUT /api/users/:id - admin-only role change
///
/// Enforces the admin-count cap and the primary-admin protection; both
/// are policy decisions, this handler only maps outcomes to HTTP.
pub async fn set_role(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleChange>,
) -> Result<impl IntoResponse, ApiError> {
    let users = UserService::new().await?;
    users.ensure_user(&auth).await?;

    let policy = AuthorizationPolicy::new().await?;
    let updated = policy.set_role(id, &body.role, &auth.subject).await?;

    Ok(Json(json!({
        "success": true,
        "data": updated,
        "message": format!("Role updated to {}", updated.role)
    })))
}
