//! CHS station listing client.

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapters::build_client;
use crate::adapters::chs::HILO_SERIES;

use super::error::StationError;

/// Listing endpoints, tried in order until one answers.
const DEFAULT_BASE_URLS: [&str; 2] = [
    "https://api.iwls-sine.azure.cloud-nuage.dfo-mpo.gc.ca/api/v1",
    "https://api-iwls.dfo-mpo.gc.ca/api/v1",
];

/// Station type that carries long-term predictions.
const PERMANENT: &str = "PERMANENT";

/// A time series offered by a station.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesDto {
    pub code: Option<String>,
}

/// Station entry from `GET /stations`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChsStationDto {
    /// Opaque IWLS identifier used in data requests
    pub id: String,
    /// Public station code, e.g. `07735`
    pub code: Option<String>,
    pub official_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operating: Option<bool>,
    #[serde(rename = "type")]
    pub station_type: Option<String>,
    #[serde(default)]
    pub time_series: Vec<TimeSeriesDto>,
    /// IANA zone name, e.g. `Canada/Pacific`
    pub time_zone_code: Option<String>,
}

impl ChsStationDto {
    /// Whether the station publishes high/low predictions we can use.
    pub fn is_listable(&self) -> bool {
        self.operating == Some(true)
            && self.station_type.as_deref() == Some(PERMANENT)
            && self
                .time_series
                .iter()
                .any(|ts| ts.code.as_deref() == Some(HILO_SERIES))
    }

    /// The station's zone, when the listing names one we recognise.
    pub fn time_zone(&self) -> Option<Tz> {
        self.time_zone_code.as_deref()?.trim().parse().ok()
    }
}

/// Configuration for the listing client.
#[derive(Debug, Clone)]
pub struct ChsListingConfig {
    /// Base URLs, tried in order
    pub base_urls: Vec<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ChsListingConfig {
    pub fn new() -> Self {
        Self {
            base_urls: DEFAULT_BASE_URLS.iter().map(|u| u.to_string()).collect(),
            timeout_secs: 30,
        }
    }

    /// Use a single base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_urls = vec![url.into()];
        self
    }

    pub fn with_base_urls(mut self, urls: Vec<String>) -> Self {
        self.base_urls = urls;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for ChsListingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the CHS station listing.
#[derive(Debug, Clone)]
pub struct ChsListingClient {
    http: reqwest::Client,
    base_urls: Vec<String>,
}

impl ChsListingClient {
    pub fn new(config: ChsListingConfig) -> Result<Self, StationError> {
        Ok(Self {
            http: build_client(config.timeout_secs)?,
            base_urls: config.base_urls,
        })
    }

    /// Fetch every listable station.
    ///
    /// The first endpoint that answers successfully wins; the error from
    /// the last endpoint is returned if none does.
    pub async fn fetch_all(&self) -> Result<Vec<ChsStationDto>, StationError> {
        let mut last_error = StationError::NoEndpoints;

        for base_url in &self.base_urls {
            match self.fetch_from(base_url).await {
                Ok(stations) => {
                    let listable: Vec<ChsStationDto> =
                        stations.into_iter().filter(|s| s.is_listable()).collect();
                    debug!(base_url, count = listable.len(), "fetched CHS station listing");
                    return Ok(listable);
                }
                Err(e) => {
                    warn!(base_url, error = %e, "CHS listing endpoint failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn fetch_from(&self, base_url: &str) -> Result<Vec<ChsStationDto>, StationError> {
        let url = format!("{}/stations", base_url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StationError::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| StationError::Json {
            message: e.to_string(),
        })
    }
}
