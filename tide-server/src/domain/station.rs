//! Station records and the provider tags attached to them.

use std::fmt;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown provider or country tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct InvalidTag {
    kind: &'static str,
    value: String,
}

/// Upstream provider that serves predictions for a station.
///
/// The tag decides which adapter handles a station and never changes once
/// a station record has been created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// NOAA CO-OPS (United States).
    #[serde(rename = "NOAA")]
    Noaa,
    /// Canadian Hydrographic Service IWLS (Canada).
    #[serde(rename = "CHS")]
    Chs,
}

impl Source {
    /// Every provider, in the order shape detection tries them.
    pub const ALL: [Source; 2] = [Source::Noaa, Source::Chs];

    /// Parse a provider tag, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, InvalidTag> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOAA" => Ok(Source::Noaa),
            "CHS" => Ok(Source::Chs),
            _ => Err(InvalidTag {
                kind: "source",
                value: s.to_string(),
            }),
        }
    }

    /// Returns the tag as it appears in datasets and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Noaa => "NOAA",
            Source::Chs => "CHS",
        }
    }

    /// The country whose stations this provider covers.
    pub fn country(&self) -> Country {
        match self {
            Source::Noaa => Country::UnitedStates,
            Source::Chs => Country::Canada,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Country a station belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "USA")]
    UnitedStates,
    #[serde(rename = "Canada")]
    Canada,
}

impl Country {
    /// Parse a country filter such as `US`, `usa`, `CA` or `Canada`.
    pub fn parse(s: &str) -> Result<Self, InvalidTag> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" | "usa" | "united states" => Ok(Country::UnitedStates),
            "ca" | "can" | "canada" => Ok(Country::Canada),
            _ => Err(InvalidTag {
                kind: "country",
                value: s.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Country::UnitedStates => "USA",
            Country::Canada => "Canada",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic position of a station in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A tide-prediction station known to the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Identifier in the provider's namespace (e.g. `9449639`, `07735`).
    pub id: String,
    /// Human-readable place name.
    pub name: String,
    pub country: Country,
    pub source: Source,
    pub coordinates: Option<Coordinates>,
    /// State or province code.
    pub region: Option<String>,
    /// Opaque key the provider expects in data requests, when it differs
    /// from `id` (CHS addresses stations by UUID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_key: Option<String>,
    /// Zone the station keeps its wall clock in, for providers that
    /// report UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<Tz>,
}

impl Station {
    /// Create a station with the country implied by its source.
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: Source) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            country: source.country(),
            source,
            coordinates: None,
            region: None,
            upstream_key: None,
            time_zone: None,
        }
    }

    /// A placeholder record for an identifier the directory does not know.
    pub fn stub(id: impl Into<String>, source: Source) -> Self {
        let id = id.into();
        Self::new(id.clone(), id, source)
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_upstream_key(mut self, key: impl Into<String>) -> Self {
        self.upstream_key = Some(key.into());
        self
    }

    pub fn with_time_zone(mut self, zone: Tz) -> Self {
        self.time_zone = Some(zone);
        self
    }

    /// The identifier to send upstream: the provider key if known, else `id`.
    pub fn upstream_id(&self) -> &str {
        self.upstream_key.as_deref().unwrap_or(&self.id)
    }
}
