//! Core domain types for the tide calendar.
//!
//! These types represent stations, their upstream providers, and the
//! canonical prediction stream every provider is normalized into.

mod prediction;
mod station;

pub use prediction::{
    CanonicalPredictionSet, InvalidPeriod, MAX_YEAR, MIN_YEAR, MonthRef, PredictionEvent, TideKind,
};
pub use station::{Coordinates, Country, InvalidTag, Source, Station};
