//! Directory Entry service: public listing plus the administrative path
//! that bypasses the request workflow (coordinates supplied explicitly).

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::profile::{ProjectRef, Socials, TrackRef, YearsActive};
use crate::database::models::rapper::{Rapper, STATUS_ACTIVE, STATUS_INACTIVE};
use crate::database::models::request::STATUS_PENDING;
use crate::services::policy::{self, AuthorizationPolicy, PolicyError};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database manager error: {0}")]
    Manager(#[from] DatabaseError),
}

/// Admin-authored entry. Unlike the approval path there is no geocoding;
/// coordinates must be supplied explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewEntry {
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
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntryChanges {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub socials: Option<Socials>,
    pub years_active: Option<YearsActive>,
    pub associated_acts: Option<Vec<String>>,
    pub producers: Option<Vec<String>>,
    pub breakout_track: Option<TrackRef>,
    pub defining_project: Option<ProjectRef>,
    pub tags: Option<Vec<String>>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub status: Option<String>,
}

pub struct DirectoryService {
    pool: PgPool,
    policy: AuthorizationPolicy,
}

impl DirectoryService {
    pub async fn new() -> Result<Self, DirectoryError> {
        let pool = DatabaseManager::pool().await?;
        let cfg = &config::config().moderation;
        let policy = AuthorizationPolicy::with_pool(
            pool.clone(),
            cfg.primary_admin_email.clone(),
            cfg.max_admins,
        );
        Ok(Self { pool, policy })
    }

    /// Public map/listing view: active entries only, newest first.
    pub async fn list_active(&self) -> Result<Vec<Rapper>, DirectoryError> {
        let entries = sqlx::query_as::<_, Rapper>(
            "SELECT * FROM rappers WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(STATUS_ACTIVE)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn get(&self, id: Uuid) -> Result<Rapper, DirectoryError> {
        sqlx::query_as::<_, Rapper>("SELECT * FROM rappers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(format!("Directory entry {} not found", id)))
    }

    /// Administrative create, bypassing the request workflow. Requires
    /// explicit numeric coordinates and respects the same duplicate-name
    /// rules as Submit.
    pub async fn create(&self, entry: NewEntry, acting_subject: &str) -> Result<Rapper, DirectoryError> {
        let admin = self.policy.require_admin(acting_subject).await?;

        if entry.name.trim().is_empty() || entry.category.trim().is_empty() {
            return Err(DirectoryError::Validation(
                "Name and category are required".to_string(),
            ));
        }
        let (lat, lng) = match (entry.lat, entry.lng) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => {
                return Err(DirectoryError::Validation(
                    "Coordinates (lat, lng) are required for direct creation".to_string(),
                ))
            }
        };

        let (name_taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM rappers WHERE lower(name) = lower($1)) \
             OR EXISTS(SELECT 1 FROM musician_requests WHERE lower(name) = lower($1) AND status = $2)",
        )
        .bind(&entry.name)
        .bind(STATUS_PENDING)
        .fetch_one(&self.pool)
        .await?;
        if name_taken {
            return Err(DirectoryError::Duplicate(format!(
                "'{}' already exists in the directory or is pending review",
                entry.name
            )));
        }

        let created = sqlx::query_as::<_, Rapper>(
            "INSERT INTO rappers \
             (name, city, state, country, address, category, bio, website, socials, \
              image_id, image_url, years_active, associated_acts, producers, \
              breakout_track, defining_project, tags, lat, lng, status, submitted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21) \
             RETURNING *",
        )
        .bind(entry.name.trim())
        .bind(&entry.city)
        .bind(&entry.state)
        .bind(&entry.country)
        .bind(&entry.address)
        .bind(&entry.category)
        .bind(&entry.bio)
        .bind(&entry.website)
        .bind(Json(&entry.socials))
        .bind(&entry.image_id)
        .bind(&entry.image_url)
        .bind(Json(&entry.years_active))
        .bind(&entry.associated_acts)
        .bind(&entry.producers)
        .bind(Json(&entry.breakout_track))
        .bind(Json(&entry.defining_project))
        .bind(&entry.tags)
        .bind(lat)
        .bind(lng)
        .bind(STATUS_ACTIVE)
        .bind(&admin.external_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Update an entry. Allowed for the entry's submitter or an admin.
    pub async fn update(
        &self,
        id: Uuid,
        changes: EntryChanges,
        acting_subject: &str,
    ) -> Result<Rapper, DirectoryError> {
        let existing = self.get(id).await?;
        self.authorize_mutation(&existing, acting_subject).await?;

        if let Some(status) = changes.status.as_deref() {
            if status != STATUS_ACTIVE && status != STATUS_INACTIVE {
                return Err(DirectoryError::Validation(format!(
                    "Unknown status '{}'",
                    status
                )));
            }
        }

        let updated = sqlx::query_as::<_, Rapper>(
            "UPDATE rappers SET city = $1, state = $2, country = $3, address = $4, \
             category = $5, bio = $6, website = $7, socials = $8, years_active = $9, \
             associated_acts = $10, producers = $11, breakout_track = $12, \
             defining_project = $13, tags = $14, lat = $15, lng = $16, status = $17, \
             updated_at = now() \
             WHERE id = $18 RETURNING *",
        )
        .bind(changes.city.unwrap_or(existing.city))
        .bind(changes.state.unwrap_or(existing.state))
        .bind(changes.country.unwrap_or(existing.country))
        .bind(changes.address.unwrap_or(existing.address))
        .bind(changes.category.unwrap_or(existing.category))
        .bind(changes.bio.unwrap_or(existing.bio))
        .bind(changes.website.unwrap_or(existing.website))
        .bind(Json(changes.socials.unwrap_or(existing.socials.0)))
        .bind(Json(changes.years_active.unwrap_or(existing.years_active.0)))
        .bind(changes.associated_acts.unwrap_or(existing.associated_acts))
        .bind(changes.producers.unwrap_or(existing.producers))
        .bind(Json(changes.breakout_track.unwrap_or(existing.breakout_track.0)))
        .bind(Json(changes.defining_project.unwrap_or(existing.defining_project.0)))
        .bind(changes.tags.unwrap_or(existing.tags))
        .bind(changes.lat.unwrap_or(existing.lat))
        .bind(changes.lng.unwrap_or(existing.lng))
        .bind(changes.status.unwrap_or(existing.status))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Delete an entry. Allowed for the entry's submitter or an admin.
    pub async fn delete(&self, id: Uuid, acting_subject: &str) -> Result<(), DirectoryError> {
        let existing = self.get(id).await?;
        self.authorize_mutation(&existing, acting_subject).await?;

        sqlx::query("DELETE FROM rappers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn authorize_mutation(&self, entry: &Rapper, subject: &str) -> Result<(), DirectoryError> {
        if policy::is_owner(&entry.submitted_by, subject) {
            return Ok(());
        }
        if self.policy.is_admin(subject).await? {
            return Ok(());
        }
        Err(DirectoryError::Forbidden(
            "Only the submitter or an admin may modify this entry".to_string(),
        ))
    }
}
