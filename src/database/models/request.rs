use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::profile::{ProjectRef, Socials, TrackRef, YearsActive};

/// Status strings stored in `musician_requests.status`. Transitions only
/// ever leave `pending`; the other two are terminal.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

/// A musician submission awaiting moderation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MusicianRequest {
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
    pub status: String,
    /// Subject id of the submitter; empty for anonymous submissions
    pub submitted_by: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MusicianRequest {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }
}
