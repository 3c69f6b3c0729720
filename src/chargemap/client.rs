//! Outbound client for the upstream charging-station directory.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use super::{normalize_station, StationRecord, UpstreamStation};
use crate::config::ChargeMapConfig;

/// Failures at the single outbound call site.
#[derive(Error, Debug)]
pub enum ChargeMapError {
    #[error("failed to reach the station directory: {0}")]
    Network(#[from] reqwest::Error),

    #[error("station directory returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("station directory returned a malformed payload: {0}")]
    MalformedPayload(String),
}

/// Query inputs for a station lookup. Serde defaults mirror the HTTP
/// contract: country `BR`, up to 500 results, 50 km radius.
#[derive(Debug, Clone, Deserialize)]
pub struct StationQuery {
    #[serde(default = "default_country_code")]
    pub countrycode: String,
    #[serde(default = "default_max_results")]
    pub maxresults: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_distance_km")]
    pub distance: f64,
}

impl Default for StationQuery {
    fn default() -> Self {
        Self {
            countrycode: default_country_code(),
            maxresults: default_max_results(),
            latitude: None,
            longitude: None,
            distance: default_distance_km(),
        }
    }
}

fn default_country_code() -> String {
    "BR".to_string()
}

fn default_max_results() -> u32 {
    500
}

fn default_distance_km() -> f64 {
    50.0
}

/// Build the upstream request URL. Radius parameters appear only when
/// both coordinates are present; absent optional inputs are omitted
/// outright, never defaulted to zero or empty in the URL.
pub fn build_poi_url(base_url: &str, api_key: Option<&str>, query: &StationQuery) -> String {
    let mut url = format!(
        "{}?output=json&countrycode={}&maxresults={}&compact=true&verbose=false",
        base_url, query.countrycode, query.maxresults
    );
    if let Some(key) = api_key {
        url.push_str(&format!("&key={}", key));
    }
    if let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) {
        url.push_str(&format!(
            "&latitude={}&longitude={}&distance={}&distanceunit=km",
            latitude, longitude, query.distance
        ));
    }
    url
}

/// Client for the upstream directory. Holds no state across requests.
pub struct ChargeMapClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChargeMapClient {
    pub fn new(config: &ChargeMapConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build station directory HTTP client")?;

        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Fetch and normalize the stations matching one query. One outbound
    /// call; no retries, no caching.
    pub async fn fetch_stations(
        &self,
        query: &StationQuery,
    ) -> Result<Vec<StationRecord>, ChargeMapError> {
        let url = build_poi_url(&self.base_url, self.api_key.as_deref(), query);
        tracing::debug!(%url, "querying station directory");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", "Gridscope")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChargeMapError::UpstreamStatus { status, body });
        }

        let body = response.text().await?;
        let raw: Vec<UpstreamStation> = serde_json::from_str(&body)
            .map_err(|e| ChargeMapError::MalformedPayload(e.to_string()))?;

        Ok(raw.into_iter().map(normalize_station).collect())
    }
}
