use axum::{
    extract::{Multipart, Path},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::forms::{self, parse_list, text};
use crate::middleware::AuthUser;
use crate::services::blogs::{slugify, BlogChanges, BlogService, NewBlog};
use crate::services::images::{ImageRef, ImageStore};
use crate::services::users::UserService;

/// GET /api/blogs - the caller's own articles, drafts included
pub async fn list_own(Extension(auth): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let author = UserService::new().await?.ensure_user(&auth).await?;
    let service = BlogService::new().await?;
    let blogs = service.list_by_author(&author).await?;
    Ok(Json(json!({ "success": true, "data": blogs })))
}

/// POST /api/blogs - create an article (multipart, optional image part)
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let author = UserService::new().await?.ensure_user(&auth).await?;
    let (fields, image) = forms::read_form(multipart).await?;

    let blog = NewBlog {
        title: text(&fields, "title"),
        content: text(&fields, "content"),
        published: fields.get("published").and_then(|v| v.parse().ok()),
        tags: parse_list(fields.get("tags")),
        subject_name: text(&fields, "subjectName"),
        born: text(&fields, "born"),
        hometown: text(&fields, "hometown"),
        genre: text(&fields, "genre"),
    };

    // Slug derivation is the only create-time validation; run it before
    // the image hits the store so a bad title never strands an upload.
    if slugify(&blog.title).is_empty() {
        return Err(ApiError::validation_error(
            "Title must contain at least one alphanumeric character",
        ));
    }

    let image_ref = upload_if_present(image).await?;
    let service = BlogService::new().await?;
    let created = match service.create(blog, &author, image_ref.clone()).await {
        Ok(created) => created,
        Err(e) => {
            retire(image_ref).await;
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": created,
            "message": "Article published"
        })),
    ))
}

/// PUT /api/blogs/:id - edit an article (author only); a new image part
/// replaces and retires the previous one
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let acting = UserService::new().await?.ensure_user(&auth).await?;
    let (fields, image) = forms::read_form(multipart).await?;

    let changes = BlogChanges {
        title: fields.get("title").cloned(),
        content: fields.get("content").cloned(),
        published: fields.get("published").and_then(|v| v.parse().ok()),
        tags: fields.get("tags").map(|raw| parse_list(Some(raw))),
        subject_name: fields.get("subjectName").cloned(),
        born: fields.get("born").cloned(),
        hometown: fields.get("hometown").cloned(),
        genre: fields.get("genre").cloned(),
    };

    if let Some(title) = &changes.title {
        if slugify(title).is_empty() {
            return Err(ApiError::validation_error(
                "Title must contain at least one alphanumeric character",
            ));
        }
    }

    let image_ref = upload_if_present(image).await?;
    let service = BlogService::new().await?;
    let updated = match service.update(id, changes, &acting, image_ref.clone()).await {
        Ok(updated) => updated,
        Err(e) => {
            retire(image_ref).await;
            return Err(e.into());
        }
    };

    Ok(Json(json!({
        "success": true,
        "data": updated,
        "message": "Article updated"
    })))
}

/// DELETE /api/blogs/:id - delete an article (author or admin)
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let acting = UserService::new().await?.ensure_user(&auth).await?;
    let service = BlogService::new().await?;
    service.delete(id, &acting).await?;
    Ok(Json(json!({ "success": true, "message": "Article deleted" })))
}

async fn upload_if_present(image: Option<(Vec<u8>, String)>) -> Result<Option<ImageRef>, ApiError> {
    match image {
        Some((bytes, filename)) => {
            let image_ref = ImageStore::from_config().upload(bytes, &filename).await?;
            Ok(Some(image_ref))
        }
        None => Ok(None),
    }
}

/// The article was never written, so a freshly uploaded image has no
/// owner and gets deleted from the store.
async fn retire(image_ref: Option<ImageRef>) {
    if let Some(image_ref) = image_ref {
        ImageStore::from_config().delete_quietly(&image_ref.id).await;
    }
}
