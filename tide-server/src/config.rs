//! Server configuration from `TIDE_*` environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `TIDE_BIND` | `127.0.0.1:3000` |
//! | `TIDE_NOAA_DATASET` | `data/noaa_stations.csv` |
//! | `TIDE_CHS_DATASET` | `data/chs_stations.csv` |
//! | `TIDE_LISTING_CACHE` | `cache/chs_stations.json` |
//! | `TIDE_CACHE_DIR` | `cache/calendars` |
//! | `TIDE_RETENTION_DAYS` | `30` |
//! | `TIDE_CACHE_MAX_ENTRIES` | `256` (calendars indexed in memory) |
//! | `TIDE_RESYNC_HOURS` | `24` |
//! | `TIDE_SWEEP_HOURS` | `6` |
//! | `TIDE_NOAA_URL` | NOAA CO-OPS production API |
//! | `TIDE_CHS_URL` | CHS IWLS production API |
//! | `TIDE_CHS_LISTING_URLS` | both IWLS hosts, comma-separated |
//! | `TIDE_OFFLINE` | `false` (skip the live CHS listing) |
//! | `TIDE_REQUEST_TIMEOUT_SECS` | `30` |
//! | `TIDE_RETRY_ATTEMPTS` | `3` |
//! | `TIDE_RETRY_DELAY_MS` | `2000` |
//! | `TIDE_RETRY_MULTIPLIER` | `2.0` |
//! | `TIDE_PCAL` / `TIDE_PS2PDF` | `pcal` / `ps2pdf` |
//! | `TIDE_RENDER_TIMEOUT_SECS` | `60` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::adapters::{ChsConfig, NoaaConfig};
use crate::cache::ArtifactCacheConfig;
use crate::render::PcalConfig;
use crate::retry::{DEFAULT_MULTIPLIER, RetryPolicy};
use crate::stations::{ChsListingConfig, ListingCacheConfig};

const HOUR: u64 = 60 * 60;

/// A configuration variable held a value that could not be used.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {var}: {message}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub message: String,
}

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub noaa_dataset: PathBuf,
    pub chs_dataset: PathBuf,
    pub listing_cache: PathBuf,
    pub cache_dir: PathBuf,
    pub retention: Duration,
    pub cache_max_entries: u64,
    pub resync_interval: Duration,
    pub sweep_interval: Duration,
    pub noaa_base_url: Option<String>,
    pub chs_base_url: Option<String>,
    pub chs_listing_urls: Option<Vec<String>>,
    pub offline: bool,
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_initial_delay: Duration,
    pub retry_multiplier: f64,
    pub pcal_bin: PathBuf,
    pub ps2pdf_bin: PathBuf,
    pub render_timeout_secs: u64,
}

impl AppConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind_addr: parse_or(&get, "TIDE_BIND", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            noaa_dataset: path_or(&get, "TIDE_NOAA_DATASET", "data/noaa_stations.csv"),
            chs_dataset: path_or(&get, "TIDE_CHS_DATASET", "data/chs_stations.csv"),
            listing_cache: path_or(&get, "TIDE_LISTING_CACHE", "cache/chs_stations.json"),
            cache_dir: path_or(&get, "TIDE_CACHE_DIR", "cache/calendars"),
            retention: Duration::from_secs(24 * HOUR * positive(&get, "TIDE_RETENTION_DAYS", 30)?),
            cache_max_entries: positive(&get, "TIDE_CACHE_MAX_ENTRIES", 256)?,
            resync_interval: Duration::from_secs(HOUR * positive(&get, "TIDE_RESYNC_HOURS", 24)?),
            sweep_interval: Duration::from_secs(HOUR * positive(&get, "TIDE_SWEEP_HOURS", 6)?),
            noaa_base_url: get("TIDE_NOAA_URL"),
            chs_base_url: get("TIDE_CHS_URL"),
            chs_listing_urls: get("TIDE_CHS_LISTING_URLS").map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(String::from)
                    .collect()
            }),
            offline: parse_bool(&get, "TIDE_OFFLINE")?,
            request_timeout_secs: positive(&get, "TIDE_REQUEST_TIMEOUT_SECS", 30)?,
            retry_attempts: parse_or(&get, "TIDE_RETRY_ATTEMPTS", 3u32)?.max(1),
            retry_initial_delay: Duration::from_millis(parse_or(&get, "TIDE_RETRY_DELAY_MS", 2000u64)?),
            retry_multiplier: multiplier(&get, "TIDE_RETRY_MULTIPLIER")?,
            pcal_bin: path_or(&get, "TIDE_PCAL", "pcal"),
            ps2pdf_bin: path_or(&get, "TIDE_PS2PDF", "ps2pdf"),
            render_timeout_secs: positive(&get, "TIDE_RENDER_TIMEOUT_SECS", 60)?,
        })
    }

    pub fn noaa(&self) -> NoaaConfig {
        let config = NoaaConfig::new().with_timeout(self.request_timeout_secs);
        match &self.noaa_base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        }
    }

    pub fn chs(&self) -> ChsConfig {
        let config = ChsConfig::new().with_timeout(self.request_timeout_secs);
        match &self.chs_base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        }
    }

    pub fn listing(&self) -> ChsListingConfig {
        let config = ChsListingConfig::new().with_timeout(self.request_timeout_secs);
        match &self.chs_listing_urls {
            Some(urls) => config.with_base_urls(urls.clone()),
            None => config,
        }
    }

    pub fn listing_cache(&self) -> ListingCacheConfig {
        ListingCacheConfig::new(&self.listing_cache)
    }

    pub fn artifact_cache(&self) -> ArtifactCacheConfig {
        ArtifactCacheConfig::new(&self.cache_dir)
            .with_retention(self.retention)
            .with_max_capacity(self.cache_max_entries)
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.retry_attempts)
            .with_initial_delay(self.retry_initial_delay)
            .with_multiplier(self.retry_multiplier)
    }

    pub fn pcal(&self) -> PcalConfig {
        PcalConfig::new()
            .with_binaries(&self.pcal_bin, &self.ps2pdf_bin)
            .with_timeout(self.render_timeout_secs)
    }
}

fn path_or(get: &impl Fn(&str) -> Option<String>, var: &str, default: &str) -> PathBuf {
    PathBuf::from(get(var).unwrap_or_else(|| default.to_string()))
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError {
                var,
                message: e.to_string(),
                value,
            })
        }
    }
}

fn positive(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let value = parse_or(get, var, default)?;
    if value == 0 {
        return Err(ConfigError {
            var,
            value: value.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Backoff growth factor; below 1 the delays would shrink.
fn multiplier(get: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<f64, ConfigError> {
    let value = parse_or(get, var, DEFAULT_MULTIPLIER)?;
    if !value.is_finite() || value < 1.0 {
        return Err(ConfigError {
            var,
            value: value.to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<bool, ConfigError> {
    match get(var).as_deref().map(str::trim) {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError {
            var,
            value: other.to_string(),
            message: "expected true or false".to_string(),
        }),
    }
}
