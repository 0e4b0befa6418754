//! On-disk copy of the Canadian stations from the last good sync.
//!
//! The file holds converted [`Station`] records, upstream keys and zones
//! included, so a restart without the listing endpoint serves exactly what
//! the last sync produced.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::write_atomic;
use crate::domain::{Source, Station};

use super::error::StationError;

/// Default snapshot TTL: 7 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct ListingSnapshot {
    synced_at: DateTime<Utc>,
    stations: Vec<Station>,
}

/// Configuration for the listing snapshot.
#[derive(Debug, Clone)]
pub struct ListingCacheConfig {
    /// Snapshot file
    pub path: PathBuf,
    /// Age after which the snapshot is ignored
    pub ttl: Duration,
}

impl ListingCacheConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Snapshot of the synced Canadian stations.
#[derive(Debug, Clone)]
pub struct ListingCache {
    path: PathBuf,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(config: ListingCacheConfig) -> Self {
        Self {
            path: config.path,
            ttl: config.ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored stations, if the snapshot is present, readable, fresh
    /// and non-empty.
    pub fn load(&self) -> Option<Vec<Station>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no CHS listing snapshot");
                return None;
            }
        };

        let snapshot: ListingSnapshot = match serde_json::from_slice(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable CHS listing snapshot");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(snapshot.synced_at);
        if age.to_std().is_ok_and(|age| age >= self.ttl) {
            debug!(synced_at = %snapshot.synced_at, "CHS listing snapshot expired");
            return None;
        }

        let stations: Vec<Station> = snapshot
            .stations
            .into_iter()
            .filter(|s| s.source == Source::Chs)
            .collect();
        (!stations.is_empty()).then_some(stations)
    }

    /// Replace the snapshot with `stations`.
    ///
    /// The previous snapshot stays in place until the new one is complete.
    pub fn save(&self, stations: &[Station]) -> Result<(), StationError> {
        let snapshot = ListingSnapshot {
            synced_at: Utc::now(),
            stations: stations.to_vec(),
        };
        let json = serde_json::to_vec(&snapshot).map_err(|e| StationError::Cache {
            message: format!("failed to serialize listing snapshot: {e}"),
        })?;

        write_atomic(&self.path, &json)?;
        debug!(path = %self.path.display(), count = stations.len(), "saved CHS listing snapshot");
        Ok(())
    }
}
