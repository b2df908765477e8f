//! Moderation Workflow: the pending -> approved/rejected state machine
//! for musician submissions. Approval geocodes the location, then runs
//! the status flip and the directory-entry insert in one transaction so
//! the transition is exactly-once and all-or-nothing.

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::profile::{ProjectRef, Socials, TrackRef, YearsActive};
use crate::database::models::request::{MusicianRequest, STATUS_APPROVED, STATUS_PENDING, STATUS_REJECTED};
use crate::database::models::Rapper;
use crate::services::geocoding::{self, Geocode, GeocodeError, HttpGeocoder};
use crate::services::policy::{AuthorizationPolicy, PolicyError};

pub const MAX_BIO_LENGTH: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database manager error: {0}")]
    Manager(#[from] DatabaseError),
}

/// Incoming submission payload. Optional sub-records default to their
/// empty forms so the later copy-on-approve mapping is total.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewRequest {
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub address: String,
    pub category: String,
    pub bio: String,
    pub website: String,
    pub socials: Socials,
    pub image_id: String,
    pub image_url: String,
    pub years_active: YearsActive,
    pub associated_acts: Vec<String>,
    pub producers: Vec<String>,
    pub breakout_track: TrackRef,
    pub defining_project: ProjectRef,
    pub tags: Vec<String>,
}

pub struct ModerationService {
    pool: PgPool,
    policy: AuthorizationPolicy,
    geocoder: Arc<dyn Geocode>,
}

impl ModerationService {
    pub async fn new() -> Result<Self, ModerationError> {
        let pool = DatabaseManager::pool().await?;
        let cfg = config::config();
        let policy = AuthorizationPolicy::with_pool(
            pool.clone(),
            cfg.moderation.primary_admin_email.clone(),
            cfg.moderation.max_admins,
        );
        let geocoder = Arc::new(HttpGeocoder::new(&cfg.geocoder));
        Ok(Self::with_parts(pool, policy, geocoder))
    }

    /// Constructor with injected collaborators, used by tests to swap in
    /// a stub geocoder.
    pub fn with_parts(pool: PgPool, policy: AuthorizationPolicy, geocoder: Arc<dyn Geocode>) -> Self {
        Self {
            pool,
            policy,
            geocoder,
        }
    }

    /// Submit a new musician request. Fails on missing required fields
    /// and on name collisions against both pending requests and the live
    /// directory. The new request starts `pending`.
    pub async fn submit(
        &self,
        request: NewRequest,
        submitter: &str,
    ) -> Result<MusicianRequest, ModerationError> {
        validate_submission(&request).map_err(ModerationError::Validation)?;

        let (pending_exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM musician_requests WHERE lower(name) = lower($1) AND status = $2)",
        )
        .bind(&request.name)
        .bind(STATUS_PENDING)
        .fetch_one(&self.pool)
        .await?;
        if pending_exists {
            return Err(ModerationError::Duplicate(format!(
                "A request for '{}' is already pending review",
                request.name
            )));
        }

        let (entry_exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM rappers WHERE lower(name) = lower($1))")
                .bind(&request.name)
                .fetch_one(&self.pool)
                .await?;
        if entry_exists {
            return Err(ModerationError::Duplicate(format!(
                "'{}' is already listed in the directory",
                request.name
            )));
        }

        let created = sqlx::query_as::<_, MusicianRequest>(
            "INSERT INTO musician_requests \
             (name, city, state, country, address, category, bio, website, socials, \
              image_id, image_url, years_active, associated_acts, producers, \
              breakout_track, defining_project, tags, status, submitted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
             RETURNING *",
        )
        .bind(&request.name)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.country)
        .bind(&request.address)
        .bind(&request.category)
        .bind(&request.bio)
        .bind(&request.website)
        .bind(Json(&request.socials))
        .bind(&request.image_id)
        .bind(&request.image_url)
        .bind(Json(&request.years_active))
        .bind(&request.associated_acts)
        .bind(&request.producers)
        .bind(Json(&request.breakout_track))
        .bind(Json(&request.defining_project))
        .bind(&request.tags)
        .bind(STATUS_PENDING)
        .bind(submitter)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Approve a pending request: geocode first (no writes on failure),
    /// then flip the status and create the directory entry atomically.
    pub async fn approve(&self, id: Uuid, acting_subject: &str) -> Result<Rapper, ModerationError> {
        let reviewer = self.policy.require_admin(acting_subject).await?;

        let request = self.load(id).await?;
        if !request.is_pending() {
            return Err(ModerationError::InvalidState(format!(
                "Request {} was already {}",
                id, request.status
            )));
        }

        // All external I/O happens before any write; a geocoding failure
        // leaves the request pending and creates nothing.
        let (primary, fallback) = geocode_queries(&request);
        let point = geocoding::resolve(self.geocoder.as_ref(), &primary, fallback.as_deref()).await?;

        let mut tx = self.pool.begin().await?;

        // Conditional flip guards against concurrent approvals: zero
        // matched rows means someone else processed the request first.
        let flipped = sqlx::query(
            "UPDATE musician_requests \
             SET status = $1, reviewed_by = $2, reviewed_at = now() \
             WHERE id = $3 AND status = $4",
        )
        .bind(STATUS_APPROVED)
        .bind(&reviewer.external_id)
        .bind(id)
        .bind(STATUS_PENDING)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ModerationError::InvalidState(format!(
                "Request {} was already processed",
                id
            )));
        }

        let entry = sqlx::query_as::<_, Rapper>(
            "INSERT INTO rappers \
             (name, city, state, country, address, category, bio, website, socials, \
              image_id, image_url, years_active, associated_acts, producers, \
              breakout_track, defining_project, tags, lat, lng, status, submitted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, 'active', $20) \
             RETURNING *",
        )
        .bind(&request.name)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.country)
        .bind(&request.address)
        .bind(&request.category)
        .bind(&request.bio)
        .bind(&request.website)
        .bind(&request.socials)
        .bind(&request.image_id)
        .bind(&request.image_url)
        .bind(&request.years_active)
        .bind(&request.associated_acts)
        .bind(&request.producers)
        .bind(&request.breakout_track)
        .bind(&request.defining_project)
        .bind(&request.tags)
        .bind(point.lat)
        .bind(point.lng)
        .bind(&request.submitted_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Approved request {} ('{}') by {}",
            id,
            request.name,
            reviewer.email
        );
        Ok(entry)
    }

    /// Reject a pending request, storing the reviewer, timestamp, and the
    /// optional reason verbatim (empty string if omitted).
    pub async fn reject(
        &self,
        id: Uuid,
        acting_subject: &str,
        reason: Option<String>,
    ) -> Result<MusicianRequest, ModerationError> {
        let reviewer = self.policy.require_admin(acting_subject).await?;

        // Early load gives a 404 for unknown ids before the state guard
        let request = self.load(id).await?;
        if !request.is_pending() {
            return Err(ModerationError::InvalidState(format!(
                "Request {} was already {}",
                id, request.status
            )));
        }

        let rejected = sqlx::query_as::<_, MusicianRequest>(
            "UPDATE musician_requests \
             SET status = $1, reviewed_by = $2, reviewed_at = now(), rejection_reason = $3 \
             WHERE id = $4 AND status = $5 \
             RETURNING *",
        )
        .bind(STATUS_REJECTED)
        .bind(&reviewer.external_id)
        .bind(reason.unwrap_or_default())
        .bind(id)
        .bind(STATUS_PENDING)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            ModerationError::InvalidState(format!("Request {} was already processed", id))
        })?;

        Ok(rejected)
    }

    /// Admin-only list of all requests across all statuses, newest first.
    pub async fn list_all(&self, acting_subject: &str) -> Result<Vec<MusicianRequest>, ModerationError> {
        self.policy.require_admin(acting_subject).await?;

        let requests = sqlx::query_as::<_, MusicianRequest>(
            "SELECT * FROM musician_requests ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn load(&self, id: Uuid) -> Result<MusicianRequest, ModerationError> {
        sqlx::query_as::<_, MusicianRequest>("SELECT * FROM musician_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("Request {} not found", id)))
    }
}

/// Required fields for a submission: name, a locatable place (city plus
/// state or country), category, bio (bounded), and an image reference.
pub fn validate_submission(request: &NewRequest) -> Result<(), String> {
    let has_image = !request.image_id.trim().is_empty() || !request.image_url.trim().is_empty();
    validate_fields(request, has_image)
}

/// Field validation with the image requirement supplied by the caller,
/// for handlers that validate before the image part is uploaded.
pub fn validate_fields(request: &NewRequest, has_image: bool) -> Result<(), String> {
    let mut missing = Vec::new();
    if request.name.trim().is_empty() {
        missing.push("name");
    }
    if request.city.trim().is_empty() && request.address.trim().is_empty() {
        missing.push("city");
    }
    if request.state.trim().is_empty() && request.country.trim().is_empty() {
        missing.push("state or country");
    }
    if request.category.trim().is_empty() {
        missing.push("category");
    }
    if request.bio.trim().is_empty() {
        missing.push("bio");
    }
    if !has_image {
        missing.push("image");
    }
    if !missing.is_empty() {
        return Err(format!("Missing required fields: {}", missing.join(", ")));
    }

    if request.bio.chars().count() > MAX_BIO_LENGTH {
        return Err(format!("Bio must be at most {} characters", MAX_BIO_LENGTH));
    }
    Ok(())
}

/// Primary query is the full address when present, otherwise the
/// city/state/country label; the fallback drops the street address down
/// to "city, country" (or "city, state" when no country is recorded).
pub fn geocode_queries(request: &MusicianRequest) -> (String, Option<String>) {
    let label = join_location(&[&request.city, &request.state, &request.country]);

    let primary = if request.address.trim().is_empty() {
        label.clone()
    } else {
        request.address.trim().to_string()
    };

    let fallback = if request.country.trim().is_empty() {
        join_location(&[&request.city, &request.state])
    } else {
        join_location(&[&request.city, &request.country])
    };

    if fallback.is_empty() || fallback == primary {
        (primary, None)
    } else {
        (primary, Some(fallback))
    }
}

fn join_location(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn valid_submission() -> NewRequest {
        NewRequest {
            name: "MC Example".to_string(),
            city: "Sacramento".to_string(),
            state: "CA".to_string(),
            category: "Rapper".to_string(),
            bio: "Short bio".to_string(),
            image_id: "img_1".to_string(),
            image_url: "https://img.example/img_1".to_string(),
            ..NewRequest::default()
        }
    }

    fn stored_request(city: &str, state: &str, country: &str, address: &str) -> MusicianRequest {
        MusicianRequest {
            id: Uuid::new_v4(),
            name: "MC Example".to_string(),
            city: city.to_string(),
            state: state.to_string(),
            country: country.to_string(),
            address: address.to_string(),
            category: "Rapper".to_string(),
            bio: "Short bio".to_string(),
            website: String::new(),
            socials: Json(Socials::default()),
            image_id: "img_1".to_string(),
            image_url: String::new(),
            years_active: Json(YearsActive::default()),
            associated_acts: vec![],
            producers: vec![],
            breakout_track: Json(TrackRef::default()),
            defining_project: Json(ProjectRef::default()),
            tags: vec![],
            status: STATUS_PENDING.to_string(),
            submitted_by: String::new(),
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert!(validate_submission(&valid_submission()).is_ok());
    }

    #[test]
    fn missing_fields_are_named() {
        let request = NewRequest::default();
        let err = validate_submission(&request).unwrap_err();
        assert!(err.contains("name"));
        assert!(err.contains("category"));
        assert!(err.contains("bio"));
        assert!(err.contains("image"));
    }

    #[test]
    fn oversized_bio_is_rejected() {
        let mut request = valid_submission();
        request.bio = "x".repeat(MAX_BIO_LENGTH + 1);
        assert!(validate_submission(&request).is_err());
    }

    #[test]
    fn image_url_alone_satisfies_image_requirement() {
        let mut request = valid_submission();
        request.image_id = String::new();
        assert!(validate_submission(&request).is_ok());
    }

    #[test]
    fn queries_prefer_full_address_with_city_fallback() {
        let request = stored_request("Sacramento", "CA", "USA", "1234 K St, Sacramento, CA");
        let (primary, fallback) = geocode_queries(&request);
        assert_eq!(primary, "1234 K St, Sacramento, CA");
        assert_eq!(fallback.as_deref(), Some("Sacramento, USA"));
    }

    #[test]
    fn queries_without_address_use_city_label() {
        let request = stored_request("Sacramento", "CA", "", "");
        let (primary, fallback) = geocode_queries(&request);
        assert_eq!(primary, "Sacramento, CA");
        // Fallback collapses to the same label, so it is dropped
        assert_eq!(fallback, None);
    }

    #[test]
    fn queries_with_country_fall_back_to_city_country() {
        let request = stored_request("Sacramento", "CA", "USA", "");
        let (primary, fallback) = geocode_queries(&request);
        assert_eq!(primary, "Sacramento, CA, USA");
        assert_eq!(fallback.as_deref(), Some("Sacramento, USA"));
    }
}
