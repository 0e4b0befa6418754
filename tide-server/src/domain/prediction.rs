//! Tide predictions and the calendar month they belong to.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Earliest year a calendar can be requested for.
pub const MIN_YEAR: i32 = 2000;

/// Latest year a calendar can be requested for.
pub const MAX_YEAR: i32 = 2030;

/// Error returned when a (year, month) pair is not a supported period.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPeriod {
    #[error("month {0} is outside 1-12")]
    Month(u32),
    #[error("year {0} is outside the supported range 2000-2030")]
    Year(i32),
}

/// A validated calendar month.
///
/// # Examples
///
/// ```
/// use tide_server::domain::MonthRef;
///
/// let june = MonthRef::new(2024, 6).unwrap();
/// assert_eq!(june.last_day().to_string(), "2024-06-30");
///
/// assert!(MonthRef::new(2024, 13).is_err());
/// assert!(MonthRef::new(1999, 1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthRef {
    year: i32,
    month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Result<Self, InvalidPeriod> {
        if !(1..=12).contains(&month) {
            return Err(InvalidPeriod::Month(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(InvalidPeriod::Year(year));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // Validated on construction; the fallback is unreachable.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The last day of the month, accounting for leap years.
    pub fn last_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MIN)
    }

    /// Whether `date` falls within this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Whether a turning point is a high or a low tide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TideKind {
    High,
    Low,
}

impl TideKind {
    /// Parse a provider type code such as `H`, `L`, `HH` or `LL`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('H') => Some(TideKind::High),
            Some('L') => Some(TideKind::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TideKind::High => "High",
            TideKind::Low => "Low",
        }
    }
}

impl fmt::Display for TideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicted high or low tide.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionEvent {
    /// Station wall-clock time, minute precision.
    pub time: NaiveDateTime,
    /// Height above chart datum in metres. May be negative.
    pub height_m: f64,
    pub kind: TideKind,
}

impl PredictionEvent {
    pub fn new(time: NaiveDateTime, height_m: f64, kind: TideKind) -> Self {
        Self {
            time,
            height_m,
            kind,
        }
    }
}

/// Time-ordered predictions for one station and month.
///
/// Every adapter produces this shape. Events are sorted on construction
/// with a stable sort, so equal timestamps keep their upstream order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPredictionSet {
    station_name: String,
    period: MonthRef,
    events: Vec<PredictionEvent>,
}

impl CanonicalPredictionSet {
    pub fn new(
        station_name: impl Into<String>,
        period: MonthRef,
        mut events: Vec<PredictionEvent>,
    ) -> Self {
        events.sort_by_key(|e| e.time);
        Self {
            station_name: station_name.into(),
            period,
            events,
        }
    }

    /// Replace the label used on the rendered calendar.
    pub fn with_station_name(mut self, name: impl Into<String>) -> Self {
        self.station_name = name.into();
        self
    }

    pub fn station_name(&self) -> &str {
        &self.station_name
    }

    pub fn period(&self) -> MonthRef {
        self.period
    }

    pub fn events(&self) -> &[PredictionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every accepted period has a last day inside the same month
        #[test]
        fn last_day_in_month(year in MIN_YEAR..=MAX_YEAR, month in 1u32..=12) {
            let period = MonthRef::new(year, month).unwrap();
            prop_assert!(period.contains(period.last_day()));
            prop_assert!(!period.contains(period.last_day().succ_opt().unwrap()));
        }

        /// Construction always yields non-decreasing timestamps
        #[test]
        fn events_are_ordered(offsets in proptest::collection::vec(0i64..(30 * 24 * 60), 0..50)) {
            let period = MonthRef::new(2024, 6).unwrap();
            let start = period.first_day().and_hms_opt(0, 0, 0).unwrap();
            let events = offsets
                .iter()
                .map(|m| PredictionEvent::new(start + chrono::Duration::minutes(*m), 1.0, TideKind::High))
                .collect();
            let set = CanonicalPredictionSet::new("x", period, events);
            prop_assert!(set.events().windows(2).all(|w| w[0].time <= w[1].time));
        }
    }
}
