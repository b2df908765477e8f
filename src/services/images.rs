//! Image Store client. The application never stores binary payloads,
//! only the reference (id + retrievable URL) the store hands back.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ImageStoreConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image store is not configured")]
    NotConfigured,
    #[error("Image store rejected the request: {0}")]
    Rejected(String),
    #[error("Image store request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct ImageStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ImageStore {
    pub fn new(config: &ImageStoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn from_config() -> Self {
        Self::new(&crate::config::config().images)
    }

    /// Upload a binary payload, returning the stable reference.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<ImageRef, ImageError> {
        if self.base_url.is_empty() {
            return Err(ImageError::NotConfigured);
        }

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImageError::Rejected(format!("HTTP {}", response.status())));
        }

        let image_ref: ImageRef = response.json().await?;
        Ok(image_ref)
    }

    /// Delete a previously uploaded image by identifier. A missing image
    /// is treated as already deleted.
    pub async fn delete(&self, id: &str) -> Result<(), ImageError> {
        if self.base_url.is_empty() {
            return Err(ImageError::NotConfigured);
        }

        let response = self
            .client
            .delete(format!("{}/images/{}", self.base_url, id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(ImageError::Rejected(format!("HTTP {}", response.status())));
        }

        Ok(())
    }

    /// Best-effort deletion used when the owning record goes away; the
    /// failure is logged, never surfaced.
    pub async fn delete_quietly(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        if let Err(e) = self.delete(id).await {
            tracing::warn!("Failed to delete image {}: {}", id, e);
        }
    }
}
