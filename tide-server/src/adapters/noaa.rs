//! NOAA CO-OPS adapter.
//!
//! Predictions come from the `datagetter` endpoint as a CSV table of
//! high/low turning points in local standard/daylight time, metric units,
//! relative to MLLW.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use crate::domain::{CanonicalPredictionSet, MonthRef, PredictionEvent, Source, TideKind};

use super::error::AdapterError;
use super::http::{DEFAULT_TIMEOUT_SECS, build_client, fetch_text};

/// Default base URL for the CO-OPS API.
const DEFAULT_BASE_URL: &str = "https://api.tidesandcurrents.noaa.gov";

const DATAGETTER_PATH: &str = "/api/prod/datagetter";

/// Text NOAA puts in the body instead of rows when nothing is available.
const NO_DATA_SENTINEL: &str = "No Predictions data was found";

/// Check an identifier against the NOAA grammar: 6 to 8 ASCII digits.
pub fn is_valid_identifier(identifier: &str) -> bool {
    (6..=8).contains(&identifier.len()) && identifier.bytes().all(|b| b.is_ascii_digit())
}

/// Configuration for the NOAA adapter.
#[derive(Debug, Clone)]
pub struct NoaaConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl NoaaConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for NoaaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter for NOAA CO-OPS tide predictions.
#[derive(Debug, Clone)]
pub struct NoaaAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl NoaaAdapter {
    pub fn new(config: NoaaConfig) -> Result<Self, AdapterError> {
        Ok(Self {
            http: build_client(config.timeout_secs)?,
            base_url: config.base_url,
        })
    }

    /// Fetch the high/low predictions for a station and month.
    pub async fn fetch_predictions(
        &self,
        identifier: &str,
        period: MonthRef,
    ) -> Result<CanonicalPredictionSet, AdapterError> {
        if !is_valid_identifier(identifier) {
            return Err(AdapterError::InvalidIdentifier {
                identifier: identifier.to_string(),
                provider: Source::Noaa,
            });
        }

        let url = format!("{}{}", self.base_url, DATAGETTER_PATH);
        debug!(station = identifier, %period, "requesting NOAA predictions");

        let body = fetch_text(
            self.http
                .get(&url)
                .query(&request_params(identifier, period)),
        )
        .await?;

        self.parse(&body, identifier, period)
    }

    /// Parse a `datagetter` CSV body.
    ///
    /// Accepts both the `Date,Time,Prediction,Type` layout and the older
    /// `Date Time,Prediction,Type` layout. Rows that cannot be read are
    /// skipped.
    pub fn parse(
        &self,
        raw: &str,
        station: &str,
        period: MonthRef,
    ) -> Result<CanonicalPredictionSet, AdapterError> {
        if raw.trim().is_empty() {
            return Err(AdapterError::parse("empty response", raw));
        }

        if raw.contains(NO_DATA_SENTINEL) {
            return Err(AdapterError::NoData {
                station: station.to_string(),
                period,
            });
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(raw.as_bytes());

        let mut events = Vec::new();
        let mut rows = 0usize;

        for record in reader.records() {
            rows += 1;
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!(station, error = %e, "skipping unreadable NOAA row");
                    continue;
                }
            };
            match parse_row(&record) {
                Some(event) => events.push(event),
                None => warn!(station, row = ?record, "skipping malformed NOAA row"),
            }
        }

        if rows == 0 {
            return Err(AdapterError::NoData {
                station: station.to_string(),
                period,
            });
        }

        if events.is_empty() {
            return Err(AdapterError::parse(
                format!("none of {rows} rows could be parsed"),
                raw,
            ));
        }

        Ok(CanonicalPredictionSet::new(station, period, events))
    }
}

/// Query parameters for one station and month.
fn request_params(identifier: &str, period: MonthRef) -> Vec<(&'static str, String)> {
    vec![
        ("begin_date", period.first_day().format("%Y%m%d").to_string()),
        ("end_date", period.last_day().format("%Y%m%d").to_string()),
        ("station", identifier.to_string()),
        ("product", "predictions".to_string()),
        ("datum", "MLLW".to_string()),
        ("time_zone", "lst_ldt".to_string()),
        ("interval", "hilo".to_string()),
        ("units", "metric".to_string()),
        ("format", "csv".to_string()),
    ]
}

fn parse_row(record: &StringRecord) -> Option<PredictionEvent> {
    let (time, height, kind) = if record.len() >= 4 {
        let date = NaiveDate::parse_from_str(record.get(0)?, "%Y-%m-%d").ok()?;
        let time = NaiveTime::parse_from_str(record.get(1)?, "%H:%M").ok()?;
        (date.and_time(time), record.get(2)?, record.get(3)?)
    } else if record.len() == 3 {
        let time = NaiveDateTime::parse_from_str(record.get(0)?, "%Y-%m-%d %H:%M").ok()?;
        (time, record.get(1)?, record.get(2)?)
    } else {
        return None;
    };

    let height: f64 = height.parse().ok()?;
    let kind = TideKind::from_code(kind)?;
    Some(PredictionEvent::new(time, height, kind))
}
