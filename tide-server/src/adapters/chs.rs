//! Canadian Hydrographic Service (IWLS) adapter.
//!
//! Data requests address stations by an opaque UUID. Directory records
//! carry it already; bare numeric station codes are resolved through the
//! listing endpoint first, and the answer is memoized.
//!
//! IWLS reports event times in UTC. They are converted to the station's
//! zone so each tide lands on its local calendar day.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::domain::{CanonicalPredictionSet, MonthRef, PredictionEvent, Source};

use super::classify::classify_extrema;
use super::error::AdapterError;
use super::http::{DEFAULT_TIMEOUT_SECS, build_client, fetch_text};
use super::types::{StationRef, WaterLevelEvent, WaterLevelResponse};

/// Default base URL for the IWLS API.
const DEFAULT_BASE_URL: &str = "https://api-iwls.dfo-mpo.gc.ca/api/v1";

/// Time series holding predicted highs and lows.
pub const HILO_SERIES: &str = "wlp-hilo";

/// Default lifetime of a memoized code → UUID lookup.
const DEFAULT_LOOKUP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Whether `identifier` is a numeric CHS station code (4 to 6 digits).
pub fn is_station_code(identifier: &str) -> bool {
    (4..=6).contains(&identifier.len()) && identifier.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `identifier` looks like an IWLS station UUID.
pub fn is_upstream_key(identifier: &str) -> bool {
    identifier.len() > 10
        && identifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        && identifier.bytes().any(|b| b.is_ascii_alphanumeric())
}

/// Check an identifier against the CHS grammar.
pub fn is_valid_identifier(identifier: &str) -> bool {
    is_station_code(identifier) || is_upstream_key(identifier)
}

/// Configuration for the CHS adapter.
#[derive(Debug, Clone)]
pub struct ChsConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// How long a code → UUID lookup is remembered
    pub lookup_ttl: Duration,
}

impl ChsConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            lookup_ttl: DEFAULT_LOOKUP_TTL,
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

impl Default for ChsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter for CHS IWLS tide predictions.
#[derive(Debug, Clone)]
pub struct ChsAdapter {
    http: reqwest::Client,
    base_url: String,
    /// Station code → IWLS station reference.
    code_lookups: MokaCache<String, StationRef>,
}

impl ChsAdapter {
    pub fn new(config: ChsConfig) -> Result<Self, AdapterError> {
        let code_lookups = MokaCache::builder()
            .time_to_live(config.lookup_ttl)
            .max_capacity(10_000)
            .build();

        Ok(Self {
            http: build_client(config.timeout_secs)?,
            base_url: config.base_url,
            code_lookups,
        })
    }

    /// Fetch the high/low predictions for a station and month.
    ///
    /// `identifier` is either an IWLS UUID or a numeric station code. A code
    /// costs one extra lookup the first time it is seen. Times are reported
    /// in `time_zone`, else in the zone the code lookup names, else in UTC.
    pub async fn fetch_predictions(
        &self,
        identifier: &str,
        time_zone: Option<Tz>,
        period: MonthRef,
    ) -> Result<CanonicalPredictionSet, AdapterError> {
        if !is_valid_identifier(identifier) {
            return Err(AdapterError::InvalidIdentifier {
                identifier: identifier.to_string(),
                provider: Source::Chs,
            });
        }

        let (key, time_zone) = if is_station_code(identifier) {
            let found = self.lookup_station(identifier).await?;
            let zone = time_zone.or_else(|| found.time_zone());
            (found.id, zone)
        } else {
            (identifier.to_string(), time_zone)
        };
        let time_zone = time_zone.unwrap_or_else(|| {
            warn!(station = identifier, "station time zone unknown, reporting UTC");
            Tz::UTC
        });

        let url = format!("{}/stations/{}/data", self.base_url, key);
        debug!(station = identifier, %period, zone = %time_zone, "requesting CHS predictions");

        let body = fetch_text(self.http.get(&url).query(&request_params(period))).await?;

        self.parse(&body, identifier, time_zone, period)
    }

    /// Resolve a numeric station code through the listing endpoint.
    pub async fn lookup_station(&self, code: &str) -> Result<StationRef, AdapterError> {
        if let Some(found) = self.code_lookups.get(code).await {
            return Ok(found);
        }

        let url = format!("{}/stations", self.base_url);
        let body = fetch_text(self.http.get(&url).query(&[("code", code)])).await?;

        let stations: Vec<StationRef> = serde_json::from_str(&body)
            .map_err(|e| AdapterError::parse(e.to_string(), &body))?;

        let found = stations
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::UnknownStation {
                code: code.to_string(),
                provider: Source::Chs,
            })?;

        debug!(code, key = %found.id, "resolved CHS station code");
        self.code_lookups
            .insert(code.to_string(), found.clone())
            .await;
        Ok(found)
    }

    /// Parse a `wlp-hilo` data body.
    ///
    /// Event times are converted to `time_zone`. High/low kinds are
    /// recovered from the whole height sequence after ordering, then
    /// events outside `period` in local time are dropped.
    pub fn parse(
        &self,
        raw: &str,
        station: &str,
        time_zone: Tz,
        period: MonthRef,
    ) -> Result<CanonicalPredictionSet, AdapterError> {
        if raw.trim().is_empty() {
            return Err(AdapterError::parse("empty response", raw));
        }

        let events = serde_json::from_str::<WaterLevelResponse>(raw)
            .map_err(|e| AdapterError::parse(e.to_string(), raw))?
            .into_events();

        if events.is_empty() {
            return Err(AdapterError::NoData {
                station: station.to_string(),
                period,
            });
        }

        let total = events.len();
        let mut points: Vec<(NaiveDateTime, f64)> = events
            .iter()
            .filter_map(|event| {
                let point = parse_event(event, time_zone);
                if point.is_none() {
                    warn!(station, event = ?event, "skipping malformed CHS event");
                }
                point
            })
            .collect();

        if points.is_empty() {
            return Err(AdapterError::parse(
                format!("none of {total} events could be parsed"),
                raw,
            ));
        }

        points.sort_by_key(|(time, _)| *time);
        let heights: Vec<f64> = points.iter().map(|(_, h)| *h).collect();
        let events: Vec<PredictionEvent> = points
            .into_iter()
            .zip(classify_extrema(&heights))
            .filter(|((time, _), _)| period.contains(time.date()))
            .map(|((time, height), kind)| PredictionEvent::new(time, height, kind))
            .collect();

        if events.is_empty() {
            return Err(AdapterError::NoData {
                station: station.to_string(),
                period,
            });
        }

        Ok(CanonicalPredictionSet::new(station, period, events))
    }
}

/// Query parameters for the month plus a day either side, so every
/// zone's local month is covered.
fn request_params(period: MonthRef) -> Vec<(&'static str, String)> {
    let from = period.first_day().pred_opt().unwrap_or(NaiveDate::MIN);
    let to = period.last_day().succ_opt().unwrap_or(NaiveDate::MAX);
    vec![
        ("time-series-code", HILO_SERIES.to_string()),
        ("from", format!("{}T00:00:00Z", from.format("%Y-%m-%d"))),
        ("to", format!("{}T23:59:59Z", to.format("%Y-%m-%d"))),
    ]
}

fn parse_event(event: &WaterLevelEvent, time_zone: Tz) -> Option<(NaiveDateTime, f64)> {
    let time = DateTime::parse_from_rfc3339(event.event_date.as_deref()?).ok()?;
    Some((time.with_timezone(&time_zone).naive_local(), event.value?))
}
