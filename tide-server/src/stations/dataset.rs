//! Bundled station datasets.
//!
//! CSV files with a `station_id,place_name[,latitude,longitude,region]`
//! header. Coordinates and region may be blank or missing.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::adapters;
use crate::domain::{Source, Station};

use super::error::StationError;
use super::place::province_time_zone;

#[derive(Debug, Deserialize)]
struct DatasetRow {
    station_id: String,
    place_name: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default, alias = "state", alias = "province")]
    region: Option<String>,
}

/// Load a dataset file, tagging every station with `source`.
pub fn load_dataset(path: &Path, source: Source) -> Result<Vec<Station>, StationError> {
    let file = std::fs::File::open(path).map_err(|e| StationError::Dataset {
        path: path.display().to_string(),
        source: csv::Error::from(e),
    })?;
    read_dataset(file, source).map_err(|e| StationError::Dataset {
        path: path.display().to_string(),
        source: e,
    })
}

/// Read dataset rows, dropping rows that fail the provider's grammar.
pub fn read_dataset(reader: impl Read, source: Source) -> Result<Vec<Station>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut stations = Vec::new();
    for row in reader.deserialize::<DatasetRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(%source, error = %e, "skipping unreadable dataset row");
                continue;
            }
        };

        if !adapters::accepts(source, &row.station_id) {
            warn!(%source, id = %row.station_id, "dropping station with invalid identifier");
            continue;
        }
        if row.place_name.is_empty() {
            warn!(%source, id = %row.station_id, "dropping station without a name");
            continue;
        }

        let mut station = Station::new(row.station_id, row.place_name, source);
        if let (Some(lat), Some(lon)) = (row.latitude, row.longitude) {
            station = station.with_coordinates(lat, lon);
        }
        if let Some(region) = row.region.filter(|r| !r.is_empty()) {
            if source == Source::Chs
                && let Some(zone) = province_time_zone(&region)
            {
                station = station.with_time_zone(zone);
            }
            station = station.with_region(region);
        }
        stations.push(station);
    }

    Ok(stations)
}
