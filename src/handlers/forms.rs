//! Shared multipart form handling for the submit and article handlers.
//! Text parts land in a field map; the part named `image` with a
//! filename is returned as raw bytes for the Image Store.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::ApiError;

pub async fn read_form(
    mut multipart: Multipart,
) -> Result<(HashMap<String, String>, Option<(Vec<u8>, String)>), ApiError> {
    let mut fields = HashMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" && field.file_name().is_some() {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation_error(format!("Failed to read image: {}", e)))?;
            image = Some((bytes.to_vec(), filename));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::validation_error(format!("Failed to read field '{}': {}", name, e)))?;
            fields.insert(name, value);
        }
    }
    Ok((fields, image))
}

pub fn text(fields: &HashMap<String, String>, key: &str) -> String {
    fields.get(key).cloned().unwrap_or_default()
}

/// Structured sub-records arrive as JSON strings; absent or blank means
/// the type's default.
pub fn parse_json_field<T>(fields: &HashMap<String, String>, key: &str) -> Result<T, String>
where
    T: serde::de::DeserializeOwned + Default,
{
    match fields.get(key) {
        None => Ok(T::default()),
        Some(raw) if raw.trim().is_empty() => Ok(T::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| format!("Invalid '{}' field: {}", key, e)),
    }
}

/// List fields accept either a JSON array or a comma-separated string.
pub fn parse_list(raw: Option<&String>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
        return items;
    }
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_accepts_json_or_commas() {
        let json = r#"["Prod A","Prod B"]"#.to_string();
        assert_eq!(parse_list(Some(&json)), vec!["Prod A", "Prod B"]);

        let csv = "west coast, underground".to_string();
        assert_eq!(parse_list(Some(&csv)), vec!["west coast", "underground"]);

        let blank = "  ".to_string();
        assert!(parse_list(Some(&blank)).is_empty());
        assert!(parse_list(None).is_empty());
    }

    #[test]
    fn json_field_defaults_when_absent_or_blank() {
        let mut fields = HashMap::new();
        fields.insert("socials".to_string(), "  ".to_string());
        let parsed: serde_json::Value = parse_json_field(&fields, "socials").expect("blank defaults");
        assert_eq!(parsed, serde_json::Value::default());
        let parsed: serde_json::Value = parse_json_field(&fields, "missing").expect("absent defaults");
        assert_eq!(parsed, serde_json::Value::default());
    }

    #[test]
    fn malformed_json_field_names_the_key() {
        let mut fields = HashMap::new();
        fields.insert("yearsActive".to_string(), "{not json".to_string());
        let err = parse_json_field::<serde_json::Value>(&fields, "yearsActive").unwrap_err();
        assert!(err.contains("yearsActive"));
    }
}
