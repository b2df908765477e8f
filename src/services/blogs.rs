//! Article service: author-owned long-form content with globally unique
//! title-derived slugs and an image reference tied to the article's
//! lifecycle.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Blog, User};
use crate::services::images::{ImageError, ImageRef, ImageStore};
use crate::services::policy::{AuthorizationPolicy, PolicyError};

#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database manager error: {0}")]
    Manager(#[from] DatabaseError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewBlog {
    pub title: String,
    pub content: String,
    pub published: Option<bool>,
    pub tags: Vec<String>,
    pub subject_name: String,
    pub born: String,
    pub hometown: String,
    pub genre: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlogChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub subject_name: Option<String>,
    pub born: Option<String>,
    pub hometown: Option<String>,
    pub genre: Option<String>,
}

pub struct BlogService {
    pool: PgPool,
    policy: AuthorizationPolicy,
    images: ImageStore,
}

impl BlogService {
    pub async fn new() -> Result<Self, BlogError> {
        let pool = DatabaseManager::pool().await?;
        let cfg = config::config();
        let policy = AuthorizationPolicy::with_pool(
            pool.clone(),
            cfg.moderation.primary_admin_email.clone(),
            cfg.moderation.max_admins,
        );
        let images = ImageStore::new(&cfg.images);
        Ok(Self { pool, policy, images })
    }

    pub async fn create(
        &self,
        blog: NewBlog,
        author: &User,
        image: Option<ImageRef>,
    ) -> Result<Blog, BlogError> {
        if blog.title.trim().is_empty() {
            return Err(BlogError::Validation("Title is required".to_string()));
        }
        if blog.content.trim().is_empty() {
            return Err(BlogError::Validation("Content is required".to_string()));
        }

        let slug = self.derive_unique_slug(&blog.title, None).await?;
        let image = image.unwrap_or(ImageRef {
            id: String::new(),
            url: String::new(),
        });

        let created = sqlx::query_as::<_, Blog>(
            "INSERT INTO blogs \
             (title, slug, content, image_id, image_url, author_id, published, tags, \
              subject_name, born, hometown, genre) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING *",
        )
        .bind(blog.title.trim())
        .bind(&slug)
        .bind(&blog.content)
        .bind(&image.id)
        .bind(&image.url)
        .bind(author.id)
        .bind(blog.published.unwrap_or(true))
        .bind(&blog.tags)
        .bind(&blog.subject_name)
        .bind(&blog.born)
        .bind(&blog.hometown)
        .bind(&blog.genre)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Blog, BlogError> {
        sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE slug = $1 AND published = true")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BlogError::NotFound(format!("Blog '{}' not found", slug)))
    }

    pub async fn list_published(&self) -> Result<Vec<Blog>, BlogError> {
        let blogs = sqlx::query_as::<_, Blog>(
            "SELECT * FROM blogs WHERE published = true ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(blogs)
    }

    pub async fn list_by_author(&self, author: &User) -> Result<Vec<Blog>, BlogError> {
        let blogs = sqlx::query_as::<_, Blog>(
            "SELECT * FROM blogs WHERE author_id = $1 ORDER BY created_at DESC",
        )
        .bind(author.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(blogs)
    }

    /// Edit an article. Only the author may edit; a title change derives
    /// a fresh unique slug; a replacement image retires the old one.
    pub async fn update(
        &self,
        id: Uuid,
        changes: BlogChanges,
        acting: &User,
        new_image: Option<ImageRef>,
    ) -> Result<Blog, BlogError> {
        let existing = self.load(id).await?;
        if existing.author_id != acting.id {
            return Err(BlogError::Forbidden(
                "Only the author may edit this article".to_string(),
            ));
        }

        let title = changes.title.unwrap_or(existing.title);
        if title.trim().is_empty() {
            return Err(BlogError::Validation("Title is required".to_string()));
        }
        let slug = if slugify(&title) == strip_suffix(&existing.slug) {
            existing.slug.clone()
        } else {
            self.derive_unique_slug(&title, Some(id)).await?
        };

        let (image_id, image_url, old_image_id) = match &new_image {
            Some(image) => (image.id.clone(), image.url.clone(), existing.image_id.clone()),
            None => (existing.image_id.clone(), existing.image_url.clone(), String::new()),
        };

        let updated = sqlx::query_as::<_, Blog>(
            "UPDATE blogs SET title = $1, slug = $2, content = $3, image_id = $4, \
             image_url = $5, published = $6, tags = $7, subject_name = $8, born = $9, \
             hometown = $10, genre = $11, updated_at = now() \
             WHERE id = $12 RETURNING *",
        )
        .bind(title.trim())
        .bind(&slug)
        .bind(changes.content.unwrap_or(existing.content))
        .bind(&image_id)
        .bind(&image_url)
        .bind(changes.published.unwrap_or(existing.published))
        .bind(changes.tags.unwrap_or(existing.tags))
        .bind(changes.subject_name.unwrap_or(existing.subject_name))
        .bind(changes.born.unwrap_or(existing.born))
        .bind(changes.hometown.unwrap_or(existing.hometown))
        .bind(changes.genre.unwrap_or(existing.genre))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if !old_image_id.is_empty() {
            self.images.delete_quietly(&old_image_id).await;
        }
        Ok(updated)
    }

    /// Delete an article. The author or an admin may delete; the image
    /// reference is retired best-effort afterwards.
    pub async fn delete(&self, id: Uuid, acting: &User) -> Result<(), BlogError> {
        let existing = self.load(id).await?;

        let is_author = existing.author_id == acting.id;
        let is_admin = self.policy.is_admin(&acting.external_id).await?;
        if !is_author && !is_admin {
            return Err(BlogError::Forbidden(
                "Only the author or an admin may delete this article".to_string(),
            ));
        }

        sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if !existing.image_id.is_empty() {
            self.images.delete_quietly(&existing.image_id).await;
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Blog, BlogError> {
        sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BlogError::NotFound(format!("Blog {} not found", id)))
    }

    /// Slug uniqueness: collect slugs sharing the base (excluding the
    /// article being edited) and pick the first free numeric suffix.
    async fn derive_unique_slug(&self, title: &str, exclude: Option<Uuid>) -> Result<String, BlogError> {
        let base = slugify(title);
        if base.is_empty() {
            return Err(BlogError::Validation(
                "Title must contain at least one alphanumeric character".to_string(),
            ));
        }

        let taken: Vec<(String,)> = sqlx::query_as(
            "SELECT slug FROM blogs WHERE (slug = $1 OR slug LIKE $2) AND ($3::uuid IS NULL OR id <> $3)",
        )
        .bind(&base)
        .bind(format!("{}-%", base))
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        let taken: Vec<String> = taken.into_iter().map(|(s,)| s).collect();
        Ok(unique_slug(&base, &taken))
    }
}

/// Lowercase, alphanumerics kept, everything else collapsed to single
/// hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// First free slug among `base`, `base-2`, `base-3`, ...
pub fn unique_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.iter().any(|s| s == &candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Strip a trailing `-N` collision suffix to recover the base slug.
fn strip_suffix(slug: &str) -> &str {
    match slug.rsplit_once('-') {
        Some((base, suffix)) if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) => base,
        _ => slug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("The Life of MC Example"), "the-life-of-mc-example");
        assert_eq!(slugify("  Straight   Outta: Sacramento!  "), "straight-outta-sacramento");
    }

    #[test]
    fn slugify_drops_leading_and_trailing_separators() {
        assert_eq!(slugify("...dots..."), "dots");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn unique_slug_is_base_when_free() {
        assert_eq!(unique_slug("my-post", &[]), "my-post");
    }

    #[test]
    fn unique_slug_appends_first_free_suffix() {
        let taken = vec!["my-post".to_string(), "my-post-2".to_string()];
        assert_eq!(unique_slug("my-post", &taken), "my-post-3");
    }

    #[test]
    fn strip_suffix_recovers_base() {
        assert_eq!(strip_suffix("my-post-2"), "my-post");
        assert_eq!(strip_suffix("my-post"), "my-post");
        assert_eq!(strip_suffix("post-2024-recap"), "post-2024-recap");
    }
}
