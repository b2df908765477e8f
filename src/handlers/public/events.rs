use axum::{http::HeaderMap, response::IntoResponse, Json};
use serde_json::json;

use crate::config;
use crate::error::ApiError;
use crate::services::users::{GatewayEvent, UserService};

/// POST /auth/events - Identity Gateway webhook
///
/// Account create/update/delete events from the gateway, authenticated
/// by a shared secret header. User records are never mutated from any
/// other path except the lazy first-contact upsert.
pub async fn gateway_event(
    headers: HeaderMap,
    Json(event): Json<GatewayEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let expected = &config::config().security.gateway_webhook_secret;
    if expected.is_empty() {
        return Err(ApiError::service_unavailable("Gateway webhook not configured"));
    }

    let supplied = headers
        .get("x-gateway-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !secrets_match(supplied, expected) {
        return Err(ApiError::unauthorized("Invalid webhook secret"));
    }

    tracing::info!("Gateway event {} for subject {}", event.event, event.subject);

    let service = UserService::new().await?;
    service.apply_event(event).await?;

    Ok(Json(json!({ "success": true, "message": "Event applied" })))
}

/// Comparison time must not depend on where the secrets diverge.
fn secrets_match(supplied: &str, expected: &str) -> bool {
    let supplied = supplied.as_bytes();
    let expected = expected.as_bytes();
    if supplied.len() != expected.len() {
        return false;
    }
    supplied
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison() {
        assert!(secrets_match("hook-secret", "hook-secret"));
        assert!(!secrets_match("hook-secret", "hook-secreT"));
        assert!(!secrets_match("hook", "hook-secret"));
        assert!(!secrets_match("", "hook-secret"));
        assert!(secrets_match("", ""));
    }
}
