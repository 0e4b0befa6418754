//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Country, Source, Station};

/// Request to search stations.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    /// Identifier or name prefix
    #[serde(default)]
    pub q: String,

    /// Optional country filter (`US`, `USA`, `CA`, `Canada`)
    pub country: Option<String>,

    /// Maximum number of results (default 10, max 50)
    pub limit: Option<usize>,
}

/// A station in API responses.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StationResult {
    pub id: String,
    pub name: String,
    pub country: Country,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl StationResult {
    pub fn from_station(station: &Station) -> Self {
        Self {
            id: station.id.clone(),
            name: station.name.clone(),
            country: station.country,
            source: station.source,
            latitude: station.coordinates.map(|c| c.latitude),
            longitude: station.coordinates.map(|c| c.longitude),
            region: station.region.clone(),
        }
    }
}

/// Response for station search.
#[derive(Debug, Serialize, Deserialize)]
pub struct StationSearchResponse {
    pub stations: Vec<StationResult>,
}

/// Request for a calendar.
#[derive(Debug, Deserialize)]
pub struct CalendarRequest {
    /// Station identifier or place name
    pub station: String,
    pub year: i32,
    pub month: u32,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Stations to choose from when a query is ambiguous
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<StationResult>,
}
