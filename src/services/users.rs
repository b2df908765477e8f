//! Identity sync: user records mirror the Identity Gateway. Upserted on
//! gateway events and on first authenticated contact; deleted only on a
//! gateway deletion event.

use serde::Deserialize;
use sqlx::PgPool;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::User;
use crate::middleware::AuthUser;
use crate::services::policy::AuthorizationPolicy;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database manager error: {0}")]
    Manager(#[from] DatabaseError),
}

/// Account event reported by the Identity Gateway webhook.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    /// "user.created" | "user.updated" | "user.deleted"
    pub event: String,
    pub subject: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: String,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, UserError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent upsert keyed on the gateway subject id. Called on first
    /// authenticated contact and from gateway change events.
    pub async fn ensure_user(&self, auth: &AuthUser) -> Result<User, UserError> {
        if auth.subject.is_empty() || auth.email.is_empty() {
            return Err(UserError::Validation(
                "Identity token is missing subject or email".to_string(),
            ));
        }
        self.upsert(&auth.subject, &auth.email, &auth.name, &auth.picture).await
    }

    async fn upsert(
        &self,
        subject: &str,
        email: &str,
        name: &str,
        picture: &str,
    ) -> Result<User, UserError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (external_id, email, name, picture_url) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (external_id) DO UPDATE \
             SET email = EXCLUDED.email, name = EXCLUDED.name, \
                 picture_url = EXCLUDED.picture_url, updated_at = now() \
             RETURNING *",
        )
        .bind(subject)
        .bind(email)
        .bind(name)
        .bind(picture)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// Apply a gateway webhook event. Create/update are the same upsert;
    /// deletion is the only path that removes a user record.
    pub async fn apply_event(&self, event: GatewayEvent) -> Result<(), UserError> {
        match event.event.as_str() {
            "user.created" | "user.updated" => {
                if event.email.is_empty() {
                    return Err(UserError::Validation(format!(
                        "{} event is missing email",
                        event.event
                    )));
                }
                self.upsert(&event.subject, &event.email, &event.name, &event.picture)
                    .await?;
                Ok(())
            }
            "user.deleted" => {
                let result = sqlx::query("DELETE FROM users WHERE external_id = $1")
                    .bind(&event.subject)
                    .execute(&self.pool)
                    .await?;
                if result.rows_affected() == 0 {
                    tracing::warn!("Deletion event for unknown subject {}", event.subject);
                }
                Ok(())
            }
            other => Err(UserError::Validation(format!(
                "Unknown gateway event '{}'",
                other
            ))),
        }
    }

    /// Load the caller's profile, running the primary-admin role
    /// normalization on the way out.
    pub async fn profile(&self, auth: &AuthUser) -> Result<User, UserError> {
        let user = self.ensure_user(auth).await?;
        let cfg = &config::config().moderation;
        let policy = AuthorizationPolicy::with_pool(
            self.pool.clone(),
            cfg.primary_admin_email.clone(),
            cfg.max_admins,
        );
        policy
            .resolve_subject(&user.external_id)
            .await
            .map_err(|e| match e {
                crate::services::policy::PolicyError::Database(e) => UserError::Database(e),
                crate::services::policy::PolicyError::Manager(e) => UserError::Manager(e),
                other => UserError::Validation(other.to_string()),
            })?
            .ok_or_else(|| UserError::NotFound("Profile not found".to_string()))
    }
}
