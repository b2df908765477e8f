use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::profile::{ProjectRef, Socials, TrackRef, YearsActive};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

/// Public directory entry shown on the map and listing. Created by the
/// approval transition or a direct admin create; coordinates are always
/// present.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rapper {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub address: String,
    pub category: String,
    pub bio: String,
    pub website: String,
    pub socials: Json<Socials>,
    pub image_id: String,
    pub image_url: String,
    pub years_active: Json<YearsActive>,
    pub associated_acts: Vec<String>,
    pub producers: Vec<String>,
    pub breakout_track: Json<TrackRef>,
    pub defining_project: Json<ProjectRef>,
    pub tags: Vec<String>,
    pub lat: f64,
    pub lng: f64,
    pub status: String,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
