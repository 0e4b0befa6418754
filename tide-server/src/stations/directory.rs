//! The station directory.
//!
//! Holds every known station in an immutable snapshot that is swapped
//! wholesale on resync, so readers never see a half-built directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::adapters;
use crate::domain::{Country, Source, Station};

use super::cache::ListingCache;
use super::client::{ChsListingClient, ChsStationDto};
use super::dataset::load_dataset;
use super::error::StationError;
use super::place::{place_name, province_time_zone};
use super::search::{MatchRank, normalize, rank_name};

/// A station together with how well it matched a query.
#[derive(Debug, Clone, PartialEq)]
pub struct StationMatch {
    pub station: Station,
    pub rank: MatchRank,
}

/// Where the Canadian portion of the directory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOrigin {
    /// Fresh listing from the CHS API
    Remote,
    /// Last successful listing saved on disk
    DiskSnapshot,
    /// Dataset shipped with the server
    Bundled,
    /// Nothing could be loaded
    Unavailable,
}

/// Result of replacing the Canadian portion of the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub origin: ListingOrigin,
    /// Canadian stations now in the directory.
    pub canadian: usize,
    /// Canadian stations dropped because the new listing lacks them.
    pub removed: usize,
}

/// An immutable view of every known station.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    stations: HashMap<String, Station>,
}

impl DirectorySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge the primary and secondary station lists.
    ///
    /// Identifiers are unique; on a collision the first record wins.
    pub fn from_parts(primary: Vec<Station>, secondary: Vec<Station>) -> Self {
        let mut snapshot = Self::empty();
        for station in primary.into_iter().chain(secondary) {
            snapshot.insert(station);
        }
        snapshot
    }

    fn insert(&mut self, station: Station) {
        if let Some(existing) = self.stations.get(&station.id) {
            warn!(
                id = %station.id,
                kept = %existing.source,
                dropped = %station.source,
                "duplicate station identifier"
            );
            return;
        }
        self.stations.insert(station.id.clone(), station);
    }

    /// A copy with every CHS station replaced by `secondary`.
    fn with_secondary(&self, secondary: Vec<Station>) -> Self {
        let mut next = Self {
            stations: self
                .stations
                .iter()
                .filter(|(_, s)| s.source != Source::Chs)
                .map(|(id, s)| (id.clone(), s.clone()))
                .collect(),
        };
        for station in secondary {
            next.insert(station);
        }
        next
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Number of stations served by `source`.
    pub fn count(&self, source: Source) -> usize {
        self.stations.values().filter(|s| s.source == source).count()
    }

    /// Station by exact identifier.
    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.get(id.trim())
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    /// Find stations for a free-text query.
    ///
    /// An exact identifier match is returned alone. Otherwise stations are
    /// matched by name, case-insensitively, best rank first and ties in
    /// alphabetical order.
    pub fn lookup(&self, query: &str) -> Vec<StationMatch> {
        if let Some(station) = self.get(query) {
            return vec![StationMatch {
                station: station.clone(),
                rank: MatchRank::Identifier,
            }];
        }

        let query = normalize(query);
        let matches = self.stations.values().filter_map(|s| {
            rank_name(&s.name.to_lowercase(), &query).map(|rank| (rank, s))
        });
        sorted_matches(matches)
    }

    /// Autocomplete over identifiers and names.
    pub fn search(&self, prefix: &str, country: Option<Country>, limit: usize) -> Vec<Station> {
        let id_query = prefix.trim();
        let name_query = normalize(prefix);
        if name_query.is_empty() {
            return Vec::new();
        }

        let matches = self
            .stations
            .values()
            .filter(|s| country.is_none_or(|c| s.country == c))
            .filter_map(|s| {
                let rank = if s.id == id_query {
                    Some(MatchRank::Identifier)
                } else if s.id.starts_with(id_query) {
                    Some(MatchRank::IdentifierPrefix)
                } else {
                    rank_name(&s.name.to_lowercase(), &name_query)
                };
                rank.map(|r| (r, s))
            });

        sorted_matches(matches)
            .into_iter()
            .take(limit)
            .map(|m| m.station)
            .collect()
    }
}

fn sorted_matches<'a>(matches: impl Iterator<Item = (MatchRank, &'a Station)>) -> Vec<StationMatch> {
    let mut matches: Vec<(MatchRank, String, &Station)> = matches
        .map(|(rank, s)| (rank, s.name.to_lowercase(), s))
        .collect();
    matches.sort_by(|a, b| (a.0, &a.1, &a.2.id).cmp(&(b.0, &b.1, &b.2.id)));
    matches
        .into_iter()
        .map(|(rank, _, s)| StationMatch {
            station: s.clone(),
            rank,
        })
        .collect()
}

/// Convert listed CHS stations, dropping entries we cannot serve.
fn listed_stations(listing: Vec<ChsStationDto>) -> Vec<Station> {
    listing
        .into_iter()
        .filter_map(|dto| {
            let Some(code) = dto.code.clone().filter(|c| adapters::accepts(Source::Chs, c)) else {
                warn!(id = %dto.id, "dropping listed station without a valid code");
                return None;
            };
            let Some(official_name) = dto.official_name.clone().filter(|n| !n.trim().is_empty()) else {
                warn!(%code, "dropping listed station without a name");
                return None;
            };

            let (name, region) = place_name(&official_name, dto.latitude, dto.longitude);
            let zone = dto
                .time_zone()
                .or_else(|| region.as_deref().and_then(province_time_zone));
            let mut station = Station::new(code, name, Source::Chs).with_upstream_key(dto.id);
            if let (Some(lat), Some(lon)) = (dto.latitude, dto.longitude) {
                station = station.with_coordinates(lat, lon);
            }
            if let Some(region) = region {
                station = station.with_region(region);
            }
            if let Some(zone) = zone {
                station = station.with_time_zone(zone);
            }
            Some(station)
        })
        .collect()
}

/// Where the directory loads its stations from.
#[derive(Debug, Clone)]
pub struct DirectorySources {
    /// Bulk US dataset, always loaded.
    pub primary_dataset: PathBuf,
    /// Canadian dataset used when the listing is unavailable.
    pub fallback_dataset: PathBuf,
    /// Live CHS listing; `None` runs offline.
    pub listing: Option<ChsListingClient>,
    /// Disk snapshot of the last good listing.
    pub listing_cache: Option<ListingCache>,
}

impl DirectorySources {
    /// Offline sources: both bundled datasets, no listing.
    pub fn bundled(primary_dataset: impl Into<PathBuf>, fallback_dataset: impl Into<PathBuf>) -> Self {
        Self {
            primary_dataset: primary_dataset.into(),
            fallback_dataset: fallback_dataset.into(),
            listing: None,
            listing_cache: None,
        }
    }

    pub fn with_listing(mut self, listing: ChsListingClient) -> Self {
        self.listing = Some(listing);
        self
    }

    pub fn with_listing_cache(mut self, cache: ListingCache) -> Self {
        self.listing_cache = Some(cache);
        self
    }
}

/// Thread-safe station directory with background resync.
#[derive(Debug, Clone)]
pub struct StationDirectory {
    inner: Arc<RwLock<Arc<DirectorySnapshot>>>,
    sources: Arc<DirectorySources>,
}

impl StationDirectory {
    /// Load the directory from every available source.
    ///
    /// Never fails: sources that cannot be read are logged and skipped,
    /// which may leave the directory empty.
    pub async fn load(sources: DirectorySources) -> Self {
        let primary = match load_dataset(&sources.primary_dataset, Source::Noaa) {
            Ok(stations) => stations,
            Err(e) => {
                warn!(error = %e, "primary station dataset unavailable");
                Vec::new()
            }
        };

        let directory =
            Self::from_snapshot(DirectorySnapshot::from_parts(primary, Vec::new()), sources);

        // With no Canadian stations yet, a failed sync installs the fallback
        if let Err(e) = directory.resync().await {
            warn!(error = %e, "CHS listing sync failed, using fallback");
        }

        let snapshot = directory.snapshot().await;
        info!(
            total = snapshot.len(),
            us = snapshot.count(Source::Noaa),
            canada = snapshot.count(Source::Chs),
            "station directory loaded"
        );
        directory
    }

    /// Wrap an existing snapshot.
    pub fn from_snapshot(snapshot: DirectorySnapshot, sources: DirectorySources) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
            sources: Arc::new(sources),
        }
    }

    /// The current snapshot. Cheap; holds no lock once returned.
    pub async fn snapshot(&self) -> Arc<DirectorySnapshot> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot().await.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<Station> {
        self.snapshot().await.get(id).cloned()
    }

    pub async fn lookup(&self, query: &str) -> Vec<StationMatch> {
        self.snapshot().await.lookup(query)
    }

    pub async fn search(&self, prefix: &str, country: Option<Country>, limit: usize) -> Vec<Station> {
        self.snapshot().await.search(prefix, country, limit)
    }

    /// Refresh the Canadian stations from the live listing.
    ///
    /// On success, Canadian stations absent from the listing are removed.
    /// On failure the current snapshot is kept, unless it holds no Canadian
    /// stations at all, in which case the fallback sources are installed.
    /// The error is returned either way.
    pub async fn resync(&self) -> Result<SyncReport, StationError> {
        match self.fetch_listing().await {
            Ok(stations) => Ok(self.install(stations, ListingOrigin::Remote).await),
            Err(e) => {
                if self.snapshot().await.count(Source::Chs) == 0 {
                    let (fallback, origin) = self.fallback_listing();
                    if !fallback.is_empty() {
                        self.install(fallback, origin).await;
                    }
                }
                Err(e)
            }
        }
    }

    async fn fetch_listing(&self) -> Result<Vec<Station>, StationError> {
        let client = self
            .sources
            .listing
            .as_ref()
            .ok_or(StationError::NoEndpoints)?;
        let stations = listed_stations(client.fetch_all().await?);
        if stations.is_empty() {
            return Err(StationError::EmptyListing);
        }

        if let Some(cache) = &self.sources.listing_cache
            && let Err(e) = cache.save(&stations)
        {
            warn!(error = %e, "failed to save CHS listing snapshot");
        }

        Ok(stations)
    }

    /// Canadian stations from the disk snapshot, else the bundled dataset.
    fn fallback_listing(&self) -> (Vec<Station>, ListingOrigin) {
        if let Some(cache) = &self.sources.listing_cache
            && let Some(stations) = cache.load()
        {
            debug!(count = stations.len(), "using CHS listing snapshot");
            return (stations, ListingOrigin::DiskSnapshot);
        }

        match load_dataset(&self.sources.fallback_dataset, Source::Chs) {
            Ok(stations) if !stations.is_empty() => (stations, ListingOrigin::Bundled),
            Ok(_) => (Vec::new(), ListingOrigin::Unavailable),
            Err(e) => {
                warn!(error = %e, "fallback CHS dataset unavailable");
                (Vec::new(), ListingOrigin::Unavailable)
            }
        }
    }

    /// Swap in a snapshot whose Canadian portion is `secondary`.
    async fn install(&self, secondary: Vec<Station>, origin: ListingOrigin) -> SyncReport {
        let mut guard = self.inner.write().await;
        let next = guard.with_secondary(secondary);

        let removed = guard
            .stations()
            .filter(|s| s.source == Source::Chs && next.get(&s.id).is_none())
            .count();
        let report = SyncReport {
            origin,
            canadian: next.count(Source::Chs),
            removed,
        };

        *guard = Arc::new(next);
        report
    }
}
