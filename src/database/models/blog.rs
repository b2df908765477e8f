use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Long-form biographical article owned by its author. The slug is
/// derived from the title and globally unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image_id: String,
    pub image_url: String,
    pub author_id: Uuid,
    pub published: bool,
    pub tags: Vec<String>,
    pub subject_name: String,
    pub born: String,
    pub hometown: String,
    pub genre: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
