//! Calendar generation.
//!
//! Ties the pieces together: resolve the query, serve from the artifact
//! cache when possible, otherwise fetch predictions with retries, render
//! the month and store the result.

use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters::AdapterSet;
use crate::cache::{Artifact, ArtifactCache, CacheError, CacheKey};
use crate::domain::{Country, MonthRef, Station};
use crate::render::{Renderer, artifact_filename, day_file};
use crate::resolve::Resolver;
use crate::retry::RetryPolicy;
use crate::stations::{StationDirectory, StationError, SyncReport};

use super::error::CalendarError;

/// A generated (or cached) calendar and what it was generated for.
#[derive(Debug, Clone)]
pub struct CalendarArtifact {
    pub station: Station,
    pub artifact: Arc<Artifact>,
    /// Suggested filename for download
    pub download_name: String,
    /// Whether the artifact was served without rendering
    pub from_cache: bool,
}

/// The calendar pipeline.
pub struct TideCalendarService<R> {
    directory: StationDirectory,
    adapters: AdapterSet,
    retry: RetryPolicy,
    cache: ArtifactCache,
    renderer: R,
}

impl<R: Renderer> TideCalendarService<R> {
    pub fn new(
        directory: StationDirectory,
        adapters: AdapterSet,
        retry: RetryPolicy,
        cache: ArtifactCache,
        renderer: R,
    ) -> Self {
        Self {
            directory,
            adapters,
            retry,
            cache,
            renderer,
        }
    }

    pub fn directory(&self) -> &StationDirectory {
        &self.directory
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Produce the tide calendar for `query` in the given month.
    ///
    /// Failures are never cached.
    pub async fn generate(
        &self,
        query: &str,
        year: i32,
        month: u32,
    ) -> Result<CalendarArtifact, CalendarError> {
        let period = MonthRef::new(year, month)?;

        let snapshot = self.directory.snapshot().await;
        let resolved = Resolver::new(&snapshot, &self.adapters).resolve(query)?;
        let station = resolved.station;
        let download_name = artifact_filename(&station.name, period);

        let key = CacheKey::new(station.id.clone(), period);
        if let Some(artifact) = self.cache.get(&key).await? {
            debug!(station = %station.id, %period, "calendar served from cache");
            return Ok(CalendarArtifact {
                station,
                artifact,
                download_name,
                from_cache: true,
            });
        }

        let adapter = resolved.adapter;
        let target = &station;
        let predictions = self
            .retry
            .run(move |attempt| {
                debug!(station = target.upstream_id(), %period, attempt, "fetching predictions");
                adapter.fetch_predictions(target, period)
            })
            .await?
            .with_station_name(station.name.clone());

        let bytes = self
            .renderer
            .render(&day_file(&predictions), period)
            .await?;
        let artifact = self.cache.insert(key, bytes).await?;

        info!(
            station = %station.id,
            source = %station.source,
            %period,
            events = predictions.len(),
            "calendar generated"
        );

        Ok(CalendarArtifact {
            station,
            artifact,
            download_name,
            from_cache: false,
        })
    }

    /// Stations whose identifier or name starts with `prefix`.
    pub async fn search_stations(
        &self,
        prefix: &str,
        country: Option<Country>,
        limit: usize,
    ) -> Vec<Station> {
        self.directory.search(prefix, country, limit).await
    }

    /// The directory record for an exact identifier.
    pub async fn station_info(&self, identifier: &str) -> Option<Station> {
        self.directory.get(identifier.trim()).await
    }

    /// Refresh the Canadian stations.
    pub async fn resync_directory(&self) -> Result<SyncReport, StationError> {
        self.directory.resync().await
    }

    /// Delete expired artifacts.
    pub async fn sweep_cache(&self) -> Result<usize, CacheError> {
        self.cache.sweep().await
    }
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
