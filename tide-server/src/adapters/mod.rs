//! Upstream prediction providers.
//!
//! Each provider validates identifiers in its own namespace, requests one
//! station-month of high/low predictions, and parses its wire format into a
//! [`CanonicalPredictionSet`]. The set of providers is closed: one variant
//! of [`Adapter`] per [`Source`].

pub mod chs;
mod classify;
mod error;
mod http;
pub mod noaa;
mod types;

pub use chs::{ChsAdapter, ChsConfig};
pub use classify::classify_extrema;
pub use error::AdapterError;
pub use http::{USER_AGENT, build_client};
pub use noaa::{NoaaAdapter, NoaaConfig};
pub use types::{StationRef, WaterLevelEvent, WaterLevelResponse};

use chrono_tz::Tz;

use crate::domain::{CanonicalPredictionSet, MonthRef, Source, Station};

/// Whether `identifier` matches the grammar of `source`.
pub fn accepts(source: Source, identifier: &str) -> bool {
    match source {
        Source::Noaa => noaa::is_valid_identifier(identifier),
        Source::Chs => chs::is_valid_identifier(identifier),
    }
}

/// Every provider whose grammar accepts `identifier`.
pub fn detect_sources(identifier: &str) -> Vec<Source> {
    Source::ALL
        .into_iter()
        .filter(|s| accepts(*s, identifier))
        .collect()
}

/// A provider adapter.
#[derive(Debug, Clone)]
pub enum Adapter {
    Noaa(NoaaAdapter),
    Chs(ChsAdapter),
}

impl Adapter {
    pub fn source(&self) -> Source {
        match self {
            Adapter::Noaa(_) => Source::Noaa,
            Adapter::Chs(_) => Source::Chs,
        }
    }

    /// Pure syntactic check of an identifier.
    pub fn validate(&self, identifier: &str) -> bool {
        accepts(self.source(), identifier)
    }

    /// Perform the upstream call for one station and month.
    ///
    /// Retries are the caller's concern.
    pub async fn fetch_predictions(
        &self,
        station: &Station,
        period: MonthRef,
    ) -> Result<CanonicalPredictionSet, AdapterError> {
        let identifier = station.upstream_id();
        match self {
            Adapter::Noaa(a) => a.fetch_predictions(identifier, period).await,
            Adapter::Chs(a) => {
                a.fetch_predictions(identifier, station.time_zone, period)
                    .await
            }
        }
    }

    /// Parse a raw response body in this provider's format.
    pub fn parse(
        &self,
        raw: &str,
        station: &Station,
        period: MonthRef,
    ) -> Result<CanonicalPredictionSet, AdapterError> {
        let identifier = station.upstream_id();
        match self {
            Adapter::Noaa(a) => a.parse(raw, identifier, period),
            Adapter::Chs(a) => {
                a.parse(raw, identifier, station.time_zone.unwrap_or(Tz::UTC), period)
            }
        }
    }
}

/// One adapter per provider.
#[derive(Debug, Clone)]
pub struct AdapterSet {
    noaa: Adapter,
    chs: Adapter,
}

impl AdapterSet {
    pub fn new(noaa: NoaaAdapter, chs: ChsAdapter) -> Self {
        Self {
            noaa: Adapter::Noaa(noaa),
            chs: Adapter::Chs(chs),
        }
    }

    /// Build both adapters from their configs.
    pub fn from_configs(noaa: NoaaConfig, chs: ChsConfig) -> Result<Self, AdapterError> {
        Ok(Self::new(NoaaAdapter::new(noaa)?, ChsAdapter::new(chs)?))
    }

    /// The adapter serving stations tagged with `source`.
    pub fn for_source(&self, source: Source) -> &Adapter {
        match source {
            Source::Noaa => &self.noaa,
            Source::Chs => &self.chs,
        }
    }
}
