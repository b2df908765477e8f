//! Geocoder integration: free-text location to coordinates with a single
//! fallback query and explicit, non-silent failure.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::GeocoderConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("No geocoding results for '{query}'")]
    NoResults { query: String },
    #[error("Geocoding provider error for '{query}': {message}")]
    Provider { query: String, message: String },
}

/// Provider seam. The production implementation talks HTTP; tests inject
/// a stub resolver.
#[async_trait]
pub trait Geocode: Send + Sync {
    /// Returns zero or more candidate points for a free-text query.
    /// Transport and provider failures are errors; an empty result set
    /// is not.
    async fn geocode(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodeError>;
}

/// Two-tier resolution: first result of the primary query wins; on zero
/// results the fallback query (if any) gets one attempt. Transport errors
/// abort immediately; there is no retry beyond the single fallback.
pub async fn resolve(
    geocoder: &dyn Geocode,
    primary: &str,
    fallback: Option<&str>,
) -> Result<GeoPoint, GeocodeError> {
    let results = geocoder.geocode(primary).await?;
    if let Some(point) = results.first() {
        return Ok(*point);
    }

    if let Some(fallback) = fallback {
        let results = geocoder.geocode(fallback).await?;
        if let Some(point) = results.first() {
            return Ok(*point);
        }
    }

    Err(GeocodeError::NoResults {
        query: primary.to_string(),
    })
}

/// HTTP geocoder against a Google-style geocoding endpoint:
/// `{ "status": "OK", "results": [ { "geometry": { "location": { "lat", "lng" } } } ] }`
pub struct HttpGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<ProviderResult>,
}

#[derive(Debug, Deserialize)]
struct ProviderResult {
    geometry: ProviderGeometry,
}

#[derive(Debug, Deserialize)]
struct ProviderGeometry {
    location: ProviderLocation,
}

#[derive(Debug, Deserialize)]
struct ProviderLocation {
    lat: f64,
    lng: f64,
}

impl HttpGeocoder {
    pub fn new(config: &GeocoderConfig) -> Self {
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

    fn provider_error(query: &str, message: impl Into<String>) -> GeocodeError {
        GeocodeError::Provider {
            query: query.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Geocode for HttpGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Self::provider_error(query, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::provider_error(
                query,
                format!("HTTP {}", response.status()),
            ));
        }

        let body: ProviderResponse = response
            .json()
            .await
            .map_err(|e| Self::provider_error(query, e.to_string()))?;

        // ZERO_RESULTS is a valid empty answer, anything else non-OK is a
        // provider failure
        if body.status != "OK" && body.status != "ZERO_RESULTS" {
            return Err(Self::provider_error(
                query,
                format!("provider status {}", body.status),
            ));
        }

        Ok(body
            .results
            .into_iter()
            .map(|r| GeoPoint {
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Stub resolver mapping fixed queries to canned answers.
    struct StubGeocoder {
        answers: HashMap<String, Vec<GeoPoint>>,
        fail_on: Option<String>,
    }

    impl StubGeocoder {
        fn new() -> Self {
            Self {
                answers: HashMap::new(),
                fail_on: None,
            }
        }

        fn with(mut self, query: &str, points: Vec<GeoPoint>) -> Self {
            self.answers.insert(query.to_string(), points);
            self
        }

        fn failing_on(mut self, query: &str) -> Self {
            self.fail_on = Some(query.to_string());
            self
        }
    }

    #[async_trait]
    impl Geocode for StubGeocoder {
        async fn geocode(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodeError> {
            if self.fail_on.as_deref() == Some(query) {
                return Err(GeocodeError::Provider {
                    query: query.to_string(),
                    message: "boom".to_string(),
                });
            }
            Ok(self.answers.get(query).cloned().unwrap_or_default())
        }
    }

    const SACRAMENTO: GeoPoint = GeoPoint {
        lat: 38.58,
        lng: -121.49,
    };

    #[tokio::test]
    async fn primary_query_first_result_wins() {
        let geocoder = StubGeocoder::new().with(
            "Sacramento, CA",
            vec![SACRAMENTO, GeoPoint { lat: 0.0, lng: 0.0 }],
        );
        let point = resolve(&geocoder, "Sacramento, CA", Some("Sacramento, USA"))
            .await
            .unwrap();
        assert_eq!(point, SACRAMENTO);
    }

    #[tokio::test]
    async fn falls_back_on_zero_results() {
        let geocoder = StubGeocoder::new().with("Sacramento, USA", vec![SACRAMENTO]);
        let point = resolve(&geocoder, "1 Nonexistent Way", Some("Sacramento, USA"))
            .await
            .unwrap();
        assert_eq!(point, SACRAMENTO);
    }

    #[tokio::test]
    async fn both_empty_is_no_results_with_primary_query() {
        let geocoder = StubGeocoder::new();
        let err = resolve(&geocoder, "nowhere", Some("also nowhere"))
            .await
            .unwrap_err();
        match err {
            GeocodeError::NoResults { query } => assert_eq!(query, "nowhere"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn no_fallback_supplied_is_no_results() {
        let geocoder = StubGeocoder::new();
        assert!(resolve(&geocoder, "nowhere", None).await.is_err());
    }

    #[tokio::test]
    async fn provider_error_propagates_without_fallback_attempt() {
        let geocoder = StubGeocoder::new()
            .failing_on("bad query")
            .with("fallback", vec![SACRAMENTO]);
        let err = resolve(&geocoder, "bad query", Some("fallback"))
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::Provider { .. }));
    }
}
