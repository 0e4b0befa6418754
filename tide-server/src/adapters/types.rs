//! Response types for the CHS IWLS API.
//!
//! These types map directly to the JSON returned by the service. Field
//! names use `#[serde(rename_all = "camelCase")]` to match the API, and
//! everything the adapter can live without is optional.

use chrono_tz::Tz;
use serde::Deserialize;

/// One point of a `wlp-hilo` time series.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterLevelEvent {
    /// UTC timestamp, e.g. `2024-06-01T05:23:00Z`
    pub event_date: Option<String>,

    /// Predicted height in metres above chart datum
    pub value: Option<f64>,

    /// Quality-control flag
    pub qc_flag_code: Option<String>,

    pub time_series_id: Option<String>,
}

/// Body of `GET /stations/{id}/data`.
///
/// The service answers with a bare array; some deployments wrap it in an
/// object with a `data` member.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WaterLevelResponse {
    Events(Vec<WaterLevelEvent>),
    Wrapped { data: Vec<WaterLevelEvent> },
}

impl WaterLevelResponse {
    pub fn into_events(self) -> Vec<WaterLevelEvent> {
        match self {
            WaterLevelResponse::Events(events) => events,
            WaterLevelResponse::Wrapped { data } => data,
        }
    }
}

/// Minimal station reference returned by `GET /stations?code=...`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRef {
    /// Opaque station identifier used in data requests
    pub id: String,

    pub code: Option<String>,

    pub official_name: Option<String>,

    /// IANA zone name, e.g. `Canada/Pacific`
    pub time_zone_code: Option<String>,
}

impl StationRef {
    /// The station's zone, when the service names one we recognise.
    pub fn time_zone(&self) -> Option<Tz> {
        self.time_zone_code.as_deref()?.trim().parse().ok()
    }
}
