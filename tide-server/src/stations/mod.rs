//! Station directory.
//!
//! Merges the bundled US dataset with the Canadian stations synced from the
//! CHS listing endpoint, falling back to a disk snapshot or the bundled
//! Canadian dataset when the listing is unavailable.

mod cache;
mod client;
mod dataset;
mod directory;
mod error;
mod place;
mod search;

pub use cache::{ListingCache, ListingCacheConfig};
pub use client::{ChsListingClient, ChsListingConfig, ChsStationDto, TimeSeriesDto};
pub use dataset::{load_dataset, read_dataset};
pub use directory::{
    DirectorySnapshot, DirectorySources, ListingOrigin, StationDirectory, StationMatch, SyncReport,
};
pub use error::StationError;
pub use place::{
    PROVINCE_CODES, place_name, province_from_coordinates, province_from_name, province_time_zone,
};
pub use search::MatchRank;
