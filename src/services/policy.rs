//! Authorization Policy: admin checks, resource ownership, and the
//! admin-count invariant.

use sqlx::PgPool;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::user::{User, ROLE_ADMIN, ROLE_USER};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    LimitExceeded(String),
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database manager error: {0}")]
    Manager(#[from] DatabaseError),
}

pub struct AuthorizationPolicy {
    pool: PgPool,
    primary_admin_email: String,
    max_admins: i64,
}

impl AuthorizationPolicy {
    pub async fn new() -> Result<Self, PolicyError> {
        let pool = DatabaseManager::pool().await?;
        let moderation = &config::config().moderation;
        Ok(Self::with_pool(
            pool,
            moderation.primary_admin_email.clone(),
            moderation.max_admins,
        ))
    }

    /// Constructor with explicit configuration, used by other services
    /// and by tests pointing at their own database.
    pub fn with_pool(pool: PgPool, primary_admin_email: String, max_admins: i64) -> Self {
        Self {
            pool,
            primary_admin_email,
            max_admins,
        }
    }

    /// Resolve a subject id to its user record, or None for unknown
    /// subjects. The primary admin's role is normalized on every read.
    pub async fn resolve_subject(&self, subject: &str) -> Result<Option<User>, PolicyError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?;

        match user {
            Some(user) => Ok(Some(self.normalize_primary_admin(user).await?)),
            None => Ok(None),
        }
    }

    /// Self-healing bootstrap: the configured primary-admin email always
    /// carries the admin role, repaired lazily on read. The cap does not
    /// apply to this repair.
    async fn normalize_primary_admin(&self, user: User) -> Result<User, PolicyError> {
        if user.role == ROLE_ADMIN
            || self.primary_admin_email.is_empty()
            || user.email != self.primary_admin_email
        {
            return Ok(user);
        }

        tracing::info!("Normalizing primary admin role for {}", user.email);
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(ROLE_ADMIN)
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// True iff the subject resolves to a user holding the admin role
    /// (or the primary-admin email, which implies it).
    pub async fn is_admin(&self, subject: &str) -> Result<bool, PolicyError> {
        Ok(self
            .resolve_subject(subject)
            .await?
            .map(|u| u.is_admin())
            .unwrap_or(false))
    }

    /// Fail with Unauthenticated for unknown subjects, Forbidden for
    /// known non-admins; return the admin's user record otherwise.
    pub async fn require_admin(&self, subject: &str) -> Result<User, PolicyError> {
        let user = self
            .resolve_subject(subject)
            .await?
            .ok_or(PolicyError::Unauthenticated)?;

        if !user.is_admin() {
            return Err(PolicyError::Forbidden("Admin privileges required".to_string()));
        }
        Ok(user)
    }

    /// True iff another account can still be promoted under the cap.
    pub async fn can_promote(&self) -> Result<bool, PolicyError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1")
                .bind(ROLE_ADMIN)
                .fetch_one(&self.pool)
                .await?;
        Ok(count < self.max_admins)
    }

    /// Change a user's role. The acting subject must be an admin;
    /// promotions are capped; the primary admin can never be demoted.
    pub async fn set_role(
        &self,
        target_id: Uuid,
        new_role: &str,
        acting_subject: &str,
    ) -> Result<User, PolicyError> {
        self.require_admin(acting_subject).await?;

        if new_role != ROLE_USER && new_role != ROLE_ADMIN {
            return Err(PolicyError::Validation(format!(
                "Unknown role '{}'",
                new_role
            )));
        }

        let target = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PolicyError::NotFound(format!("User {} not found", target_id)))?;

        if demotion_of_primary_admin(&target.email, &self.primary_admin_email, new_role) {
            return Err(PolicyError::Forbidden(
                "The primary admin cannot be demoted".to_string(),
            ));
        }

        if new_role == ROLE_ADMIN {
            // Cap enforced inside one conditional statement instead of a
            // separate count-then-set; zero matched rows means the cap
            // would be exceeded. The target is excluded from the count so
            // re-promoting an admin stays a no-op.
            let updated = sqlx::query_as::<_, User>(
                "UPDATE users SET role = $1, updated_at = now() \
                 WHERE id = $2 \
                 AND (SELECT COUNT(*) FROM users WHERE role = $1 AND id <> $2) < $3 \
                 RETURNING *",
            )
            .bind(ROLE_ADMIN)
            .bind(target_id)
            .bind(self.max_admins)
            .fetch_optional(&self.pool)
            .await?;

            return updated.ok_or_else(|| {
                PolicyError::LimitExceeded(format!(
                    "At most {} accounts may hold the admin role",
                    self.max_admins
                ))
            });
        }

        let updated = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(ROLE_USER)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }
}

/// Ownership check: a resource's stored submitter/author identity against
/// the caller's subject id. Empty owners (anonymous submissions) match
/// nobody.
pub fn is_owner(owner_subject: &str, subject: &str) -> bool {
    !owner_subject.is_empty() && owner_subject == subject
}

fn demotion_of_primary_admin(target_email: &str, primary_email: &str, new_role: &str) -> bool {
    !primary_email.is_empty() && target_email == primary_email && new_role == ROLE_USER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_check_matches_exact_subject() {
        assert!(is_owner("auth0|abc", "auth0|abc"));
        assert!(!is_owner("auth0|abc", "auth0|other"));
    }

    #[test]
    fn anonymous_submissions_have_no_owner() {
        assert!(!is_owner("", ""));
        assert!(!is_owner("", "auth0|abc"));
    }

    #[test]
    fn primary_admin_demotion_is_flagged_regardless_of_actor() {
        assert!(demotion_of_primary_admin("boss@example.com", "boss@example.com", ROLE_USER));
        assert!(!demotion_of_primary_admin("boss@example.com", "boss@example.com", ROLE_ADMIN));
        assert!(!demotion_of_primary_admin("other@example.com", "boss@example.com", ROLE_USER));
    }

    #[test]
    fn unset_primary_admin_email_protects_nobody() {
        assert!(!demotion_of_primary_admin("boss@example.com", "", ROLE_USER));
    }
}
