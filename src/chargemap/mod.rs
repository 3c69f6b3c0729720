//! Charging-station ingestion: upstream payload model, normalization,
//! and the outbound directory client.
//!
//! The upstream directory returns deeply nested records where any
//! sub-object may be missing. The payload is modeled with every field
//! optional, and flattened into `StationRecord` by a single mapping
//! function that owns every documented default.

mod client;
mod normalize;

pub use client::{ChargeMapClient, ChargeMapError, StationQuery};
pub use normalize::{normalize_station, UNKNOWN_LABEL, UNNAMED_STATION};

use serde::{Deserialize, Serialize};

/// Flattened charging-station entry served to the dashboard. Produced
/// per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub address: String,
    pub town: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operator: String,
    pub operator_website: Option<String>,
    pub usage_cost: Option<String>,
    pub num_points: u32,
    pub connections: Vec<ConnectionRecord>,
    pub status: String,
    pub is_operational: bool,
    pub date_last_verified: Option<String>,
    pub date_created: Option<String>,
}

/// One connector at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub id: i64,
    pub connection_type: String,
    pub power_kw: Option<f64>,
    pub current_type: Option<String>,
    pub quantity: u32,
    pub status: String,
}

/// One record as returned by the upstream directory. Nothing here is
/// guaranteed to be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpstreamStation {
    #[serde(rename = "ID")]
    pub id: Option<i64>,
    #[serde(rename = "UUID")]
    pub uuid: Option<String>,
    pub address_info: Option<UpstreamAddress>,
    pub operator_info: Option<UpstreamOperator>,
    pub usage_cost: Option<String>,
    pub number_of_points: Option<u32>,
    pub connections: Option<Vec<UpstreamConnection>>,
    pub status_type: Option<UpstreamStatus>,
    pub date_last_verified: Option<String>,
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpstreamAddress {
    pub title: Option<String>,
    pub address_line1: Option<String>,
    pub town: Option<String>,
    pub state_or_province: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<UpstreamCountry>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpstreamCountry {
    pub title: Option<String>,
    #[serde(rename = "ISOCode")]
    pub iso_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpstreamOperator {
    pub title: Option<String>,
    #[serde(rename = "WebsiteURL")]
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpstreamStatus {
    pub title: Option<String>,
    pub is_operational: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpstreamConnection {
    #[serde(rename = "ID")]
    pub id: Option<i64>,
    pub connection_type: Option<UpstreamNamed>,
    #[serde(rename = "PowerKW")]
    pub power_kw: Option<f64>,
    pub current_type: Option<UpstreamNamed>,
    pub quantity: Option<u32>,
    pub status_type: Option<UpstreamStatus>,
}

/// Nested objects that only contribute a display name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpstreamNamed {
    pub title: Option<String>,
}
