use axum::{
    extract::Multipart,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::handlers::forms::{self, parse_json_field, parse_list, text};
use crate::middleware::auth::optional_auth;
use crate::services::images::{ImageRef, ImageStore};
use crate::services::moderation::{self, ModerationService, NewRequest};

/// POST /requests - submit a musician request (multipart form)
///
/// Descriptive fields arrive as text parts; the image arrives as a file
/// part named `image`. Validation runs before the image is pushed to
/// the Image Store so a bad submission never strands an upload, and a
/// store-side failure after upload retires the fresh image. Anonymous
/// submissions are accepted; a valid bearer token attributes the
/// submission to its subject.
pub async fn submit(headers: HeaderMap, multipart: Multipart) -> Result<impl IntoResponse, ApiError> {
    let submitter = optional_auth(&headers)
        .map(|auth| auth.subject)
        .unwrap_or_default();

    let (fields, image) = forms::read_form(multipart).await?;

    let mut request = request_from_fields(&fields).map_err(ApiError::validation_error)?;
    let has_image = image.is_some()
        || !request.image_id.trim().is_empty()
        || !request.image_url.trim().is_empty();
    moderation::validate_fields(&request, has_image).map_err(ApiError::validation_error)?;

    let mut uploaded: Option<ImageRef> = None;
    if let Some((bytes, filename)) = image {
        let image_ref = ImageStore::from_config().upload(bytes, &filename).await?;
        request.image_id = image_ref.id.clone();
        request.image_url = image_ref.url.clone();
        uploaded = Some(image_ref);
    }

    let service = ModerationService::new().await?;
    let created = match service.submit(request, &submitter).await {
        Ok(created) => created,
        Err(e) => {
            // Duplicate name or a storage fault: the record was never
            // written, so the upload has no owner.
            if let Some(image_ref) = uploaded {
                ImageStore::from_config().delete_quietly(&image_ref.id).await;
            }
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": created,
            "message": "Submission received and pending review"
        })),
    ))
}

/// Build a NewRequest from flat multipart text fields.
fn request_from_fields(fields: &HashMap<String, String>) -> Result<NewRequest, String> {
    Ok(NewRequest {
        name: text(fields, "name"),
        city: text(fields, "city"),
        state: text(fields, "state"),
        country: text(fields, "country"),
        address: text(fields, "address"),
        category: text(fields, "category"),
        bio: text(fields, "bio"),
        website: text(fields, "website"),
        socials: parse_json_field(fields, "socials")?,
        image_id: text(fields, "imageId"),
        image_url: text(fields, "imageUrl"),
        years_active: parse_json_field(fields, "yearsActive")?,
        associated_acts: parse_list(fields.get("associatedActs")),
        producers: parse_list(fields.get("producers")),
        breakout_track: parse_json_field(fields, "breakoutTrack")?,
        defining_project: parse_json_field(fields, "definingProject")?,
        tags: parse_list(fields.get("tags")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::profile::{ProjectRef, Socials, TrackRef, YearsActive};

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builds_request_from_flat_fields() {
        let fields = fields(&[
            ("name", "MC Example"),
            ("city", "Sacramento"),
            ("state", "CA"),
            ("category", "Rapper"),
            ("bio", "Short bio"),
            ("tags", "west coast, underground"),
            ("socials", r#"{"instagram":"@mc"}"#),
        ]);
        let request = request_from_fields(&fields).unwrap();
        assert_eq!(request.name, "MC Example");
        assert_eq!(request.tags, vec!["west coast", "underground"]);
        assert_eq!(request.socials.instagram, "@mc");
        assert_eq!(request.breakout_track, TrackRef::default());
    }

    #[test]
    fn list_fields_accept_json_arrays() {
        let fields = fields(&[("producers", r#"["Prod A","Prod B"]"#)]);
        let request = request_from_fields(&fields).unwrap();
        assert_eq!(request.producers, vec!["Prod A", "Prod B"]);
    }

    #[test]
    fn malformed_sub_record_is_a_named_error() {
        let fields = fields(&[("yearsActive", "{not json")]);
        let err = request_from_fields(&fields).unwrap_err();
        assert!(err.contains("yearsActive"));
    }

    #[test]
    fn empty_sub_record_fields_default() {
        let fields = fields(&[("socials", "  ")]);
        let request = request_from_fields(&fields).unwrap();
        assert_eq!(request.socials, Socials::default());
        assert_eq!(request.years_active, YearsActive::default());
        assert_eq!(request.defining_project, ProjectRef::default());
    }

    // An incomplete submission must fail validation before any image
    // bytes would be sent to the store.
    #[test]
    fn incomplete_submission_fails_before_upload() {
        let fields = fields(&[("name", "MC Example"), ("bio", "no location given")]);
        let request = request_from_fields(&fields).unwrap();
        assert!(moderation::validate_fields(&request, true).is_err());
    }

    // A pending file part satisfies the image requirement ahead of the
    // actual upload.
    #[test]
    fn pending_upload_counts_as_image() {
        let fields = fields(&[
            ("name", "MC Example"),
            ("city", "Sacramento"),
            ("state", "CA"),
            ("category", "Rapper"),
            ("bio", "Short bio"),
        ]);
        let request = request_from_fields(&fields).unwrap();
        assert!(moderation::validate_fields(&request, true).is_ok());
        assert!(moderation::validate_fields(&request, false).is_err());
    }
}
