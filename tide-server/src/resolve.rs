//! Query resolution.
//!
//! Turns free text, a station identifier, or a bare provider code into a
//! station plus the adapter that serves it. The directory is consulted
//! first; identifier shape is the fallback.

use tracing::debug;

use crate::adapters::{Adapter, AdapterSet, detect_sources};
use crate::domain::Station;
use crate::stations::{DirectorySnapshot, MatchRank};

/// How a query was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    /// Matched a directory record
    Directory,
    /// Not in the directory; accepted by exactly one provider grammar
    Shape,
}

/// A station and the adapter for its source.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub station: Station,
    pub adapter: &'a Adapter,
    pub via: ResolvedVia,
}

/// Why a query could not be resolved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// The directory holds no stations at all
    #[error("station directory is empty")]
    DirectoryEmpty,

    /// Nothing matches the query
    #[error("no station matches {query:?}")]
    NoMatch { query: String },

    /// Several stations match and none stands out
    #[error("{query:?} matches {} stations", .candidates.len())]
    Ambiguous {
        query: String,
        candidates: Vec<Station>,
    },
}

/// Resolves queries against one directory snapshot.
pub struct Resolver<'a> {
    directory: &'a DirectorySnapshot,
    adapters: &'a AdapterSet,
}

impl<'a> Resolver<'a> {
    pub fn new(directory: &'a DirectorySnapshot, adapters: &'a AdapterSet) -> Self {
        Self {
            directory,
            adapters,
        }
    }

    pub fn resolve(&self, query: &str) -> Result<Resolved<'a>, ResolveError> {
        if self.directory.is_empty() {
            return Err(ResolveError::DirectoryEmpty);
        }

        let query = query.trim();
        let matches = self.directory.lookup(query);

        match matches.as_slice() {
            [only] => return Ok(self.resolved(only.station.clone(), ResolvedVia::Directory)),
            [best, ..] if matches!(best.rank, MatchRank::Identifier | MatchRank::ExactName) => {
                let exact: Vec<_> = matches.iter().filter(|m| m.rank == best.rank).collect();
                if exact.len() == 1 {
                    return Ok(self.resolved(best.station.clone(), ResolvedVia::Directory));
                }
                return Err(ResolveError::Ambiguous {
                    query: query.to_string(),
                    candidates: exact.into_iter().map(|m| m.station.clone()).collect(),
                });
            }
            [_, _, ..] => {
                return Err(ResolveError::Ambiguous {
                    query: query.to_string(),
                    candidates: matches.iter().map(|m| m.station.clone()).collect(),
                });
            }
            [] => {}
        }

        let sources = detect_sources(query);
        match sources.as_slice() {
            [source] => {
                debug!(query, %source, "resolved by identifier shape");
                Ok(self.resolved(Station::stub(query, *source), ResolvedVia::Shape))
            }
            [] => Err(ResolveError::NoMatch {
                query: query.to_string(),
            }),
            _ => Err(ResolveError::Ambiguous {
                query: query.to_string(),
                candidates: sources.iter().map(|s| Station::stub(query, *s)).collect(),
            }),
        }
    }

    fn resolved(&self, station: Station, via: ResolvedVia) -> Resolved<'a> {
        Resolved {
            adapter: self.adapters.for_source(station.source),
            station,
            via,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ChsConfig, NoaaConfig};
    use crate::domain::Source;

    fn adapters() -> AdapterSet {
        AdapterSet::from_configs(NoaaConfig::new(), ChsConfig::new()).unwrap()
    }

    fn directory() -> DirectorySnapshot {
        DirectorySnapshot::from_parts(
            vec![
                Station::new("9449639", "Point Roberts, WA", Source::Noaa),
                Station::new("9447130", "Seattle, WA", Source::Noaa),
                Station::new("9449880", "Friday Harbor, WA", Source::Noaa),
                Station::new("8518750", "The Battery, NY", Source::Noaa),
            ],
            vec![
                Station::new("07735", "Vancouver, BC", Source::Chs)
                    .with_upstream_key("5cebf1de3d0f4a073c4bbd8f"),
                Station::new("07795", "Point Atkinson, BC", Source::Chs),
            ],
        )
    }

    #[test]
    fn resolves_identifier() {
        let (dir, adapters) = (directory(), adapters());
        let resolved = Resolver::new(&dir, &adapters).resolve("9449639").unwrap();
        assert_eq!(resolved.station.name, "Point Roberts, WA");
        assert_eq!(resolved.adapter.source(), Source::Noaa);
        assert_eq!(resolved.via, ResolvedVia::Directory);
    }

    #[test]
    fn resolves_canadian_station_to_chs() {
        let (dir, adapters) = (directory(), adapters());
        let resolved = Resolver::new(&dir, &adapters).resolve("07735").unwrap();
        assert_eq!(resolved.adapter.source(), Source::Chs);
        assert_eq!(resolved.station.upstream_id(), "5cebf1de3d0f4a073c4bbd8f");
    }

    #[test]
    fn resolves_single_name_candidate() {
        let (dir, adapters) = (directory(), adapters());
        let resolved = Resolver::new(&dir, &adapters).resolve("battery").unwrap();
        assert_eq!(resolved.station.id, "8518750");
    }

    #[test]
    fn exact_name_beats_partial_matches() {
        let stations = vec![
            Station::new("9447130", "Seattle", Source::Noaa),
            Station::new("9447131", "Seattle North", Source::Noaa),
            Station::new("9447132", "West Seattle", Source::Noaa),
        ];
        let dir = DirectorySnapshot::from_parts(stations, Vec::new());
        let adapters = adapters();

        let resolved = Resolver::new(&dir, &adapters).resolve("seattle").unwrap();
        assert_eq!(resolved.station.id, "9447130");
    }

    #[test]
    fn several_candidates_are_ambiguous() {
        let (dir, adapters) = (directory(), adapters());
        let err = Resolver::new(&dir, &adapters).resolve("point").unwrap_err();
        match err {
            ResolveError::Ambiguous { candidates, .. } => {
                let ids: Vec<&str> = candidates.iter().map(|s| s.id.as_str()).collect();
                // Alphabetical: Point Atkinson before Point Roberts
                assert_eq!(ids, vec!["07795", "9449639"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_code_resolves_by_shape() {
        let (dir, adapters) = (directory(), adapters());

        let resolved = Resolver::new(&dir, &adapters).resolve("8454000").unwrap();
        assert_eq!(resolved.via, ResolvedVia::Shape);
        assert_eq!(resolved.adapter.source(), Source::Noaa);
        assert_eq!(resolved.station.name, "8454000");

        let resolved = Resolver::new(&dir, &adapters).resolve("00490").unwrap();
        assert_eq!(resolved.adapter.source(), Source::Chs);
    }

    #[test]
    fn six_digit_code_fits_both_grammars() {
        let (dir, adapters) = (directory(), adapters());
        let err = Resolver::new(&dir, &adapters).resolve("123456").unwrap_err();
        match err {
            ResolveError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nonsense_is_no_match() {
        let (dir, adapters) = (directory(), adapters());
        let err = Resolver::new(&dir, &adapters)
            .resolve("Nonexistent Place 123")
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoMatch {
                query: "Nonexistent Place 123".into()
            }
        );
    }

    #[test]
    fn empty_directory_wins_over_shape() {
        let dir = DirectorySnapshot::empty();
        let adapters = adapters();
        let err = Resolver::new(&dir, &adapters).resolve("9449639").unwrap_err();
        assert_eq!(err, ResolveError::DirectoryEmpty);
    }
}
