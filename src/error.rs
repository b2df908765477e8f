// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    ValidationError(String),
    Duplicate(String),
    InvalidState(String),
    LimitExceeded(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 502 Bad Gateway (external provider issues)
    Geocoding(String),
    Upstream(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError(_) => 400,
            ApiError::Duplicate(_) => 400,
            ApiError::InvalidState(_) => 400,
            ApiError::LimitExceeded(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Geocoding(_) => 502,
            ApiError::Upstream(_) => 502,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError(msg)
            | ApiError::Duplicate(msg)
            | ApiError::InvalidState(msg)
            | ApiError::LimitExceeded(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Geocoding(msg)
            | ApiError::Upstream(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Duplicate(_) => "DUPLICATE",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Geocoding(_) => "GEOCODING_FAILED",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        ApiError::Duplicate(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ApiError::InvalidState(message.into())
    }

    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        ApiError::LimitExceeded(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn geocoding(message: impl Into<String>) -> Self {
        ApiError::Geocoding(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ApiError::Upstream(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert service error types to ApiError
impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database not configured")
            }
            DatabaseError::MigrationError(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<crate::services::geocoding::GeocodeError> for ApiError {
    fn from(err: crate::services::geocoding::GeocodeError) -> Self {
        tracing::error!("Geocoding failed: {}", err);
        ApiError::geocoding(err.to_string())
    }
}

impl From<crate::services::images::ImageError> for ApiError {
    fn from(err: crate::services::images::ImageError) -> Self {
        tracing::error!("Image store error: {}", err);
        ApiError::upstream("Image store request failed")
    }
}

impl From<crate::services::policy::PolicyError> for ApiError {
    fn from(err: crate::services::policy::PolicyError) -> Self {
        use crate::services::policy::PolicyError;
        match err {
            PolicyError::Unauthenticated => ApiError::unauthorized("Authentication required"),
            PolicyError::Forbidden(msg) => ApiError::forbidden(msg),
            PolicyError::NotFound(msg) => ApiError::not_found(msg),
            PolicyError::LimitExceeded(msg) => ApiError::limit_exceeded(msg),
            PolicyError::Validation(msg) => ApiError::validation_error(msg),
            PolicyError::Database(e) => {
                tracing::error!("Policy database error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            PolicyError::Manager(e) => e.into(),
        }
    }
}

impl From<crate::services::moderation::ModerationError> for ApiError {
    fn from(err: crate::services::moderation::ModerationError) -> Self {
        use crate::services::moderation::ModerationError;
        match err {
            ModerationError::Validation(msg) => ApiError::validation_error(msg),
            ModerationError::Duplicate(msg) => ApiError::duplicate(msg),
            ModerationError::NotFound(msg) => ApiError::not_found(msg),
            ModerationError::InvalidState(msg) => ApiError::invalid_state(msg),
            ModerationError::Geocode(e) => e.into(),
            ModerationError::Policy(e) => e.into(),
            ModerationError::Database(e) => {
                tracing::error!("Moderation database error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            ModerationError::Manager(e) => e.into(),
        }
    }
}

impl From<crate::services::users::UserError> for ApiError {
    fn from(err: crate::services::users::UserError) -> Self {
        use crate::services::users::UserError;
        match err {
            UserError::NotFound(msg) => ApiError::not_found(msg),
            UserError::Validation(msg) => ApiError::validation_error(msg),
            UserError::Database(e) => {
                tracing::error!("User database error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            UserError::Manager(e) => e.into(),
        }
    }
}

impl From<crate::services::blogs::BlogError> for ApiError {
    fn from(err: crate::services::blogs::BlogError) -> Self {
        use crate::services::blogs::BlogError;
        match err {
            BlogError::NotFound(msg) => ApiError::not_found(msg),
            BlogError::Forbidden(msg) => ApiError::forbidden(msg),
            BlogError::Validation(msg) => ApiError::validation_error(msg),
            BlogError::Policy(e) => e.into(),
            BlogError::Image(e) => e.into(),
            BlogError::Database(e) => {
                tracing::error!("Blog database error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            BlogError::Manager(e) => e.into(),
        }
    }
}

impl From<crate::services::directory::DirectoryError> for ApiError {
    fn from(err: crate::services::directory::DirectoryError) -> Self {
        use crate::services::directory::DirectoryError;
        match err {
            DirectoryError::NotFound(msg) => ApiError::not_found(msg),
            DirectoryError::Forbidden(msg) => ApiError::forbidden(msg),
            DirectoryError::Duplicate(msg) => ApiError::duplicate(msg),
            DirectoryError::Validation(msg) => ApiError::validation_error(msg),
            DirectoryError::Policy(e) => e.into(),
            DirectoryError::Database(e) => {
                tracing::error!("Directory database error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DirectoryError::Manager(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        assert_eq!(ApiError::validation_error("x").status_code(), 400);
        assert_eq!(ApiError::duplicate("x").status_code(), 400);
        assert_eq!(ApiError::invalid_state("x").status_code(), 400);
        assert_eq!(ApiError::limit_exceeded("x").status_code(), 400);
        assert_eq!(ApiError::unauthorized("x").status_code(), 401);
        assert_eq!(ApiError::forbidden("x").status_code(), 403);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::geocoding("x").status_code(), 502);
        assert_eq!(ApiError::upstream("x").status_code(), 502);
        assert_eq!(ApiError::internal_server_error("x").status_code(), 500);
    }

    #[test]
    fn json_body_carries_code_and_message() {
        let body = ApiError::duplicate("name already pending").to_json();
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "DUPLICATE");
        assert_eq!(body["message"], "name already pending");
    }
}
