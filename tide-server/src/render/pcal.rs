//! Day-file generation for `pcal`.
//!
//! One line per tide event in `pcal`'s date-file syntax, followed by a
//! note naming the station. Low tides under the emphasis threshold mark
//! their date with `*` so `pcal` highlights the day.

use std::fmt::Write;

use crate::domain::{CanonicalPredictionSet, MonthRef, PredictionEvent};

/// Heights below this, in metres, are emphasized.
pub const LOW_TIDE_THRESHOLD_M: f64 = 0.3;

/// Longest sanitized name kept in a filename.
const MAX_NAME_LEN: usize = 100;

/// Whether an event gets the emphasis marker. Uses the unrounded height.
pub fn is_emphasized(event: &PredictionEvent) -> bool {
    event.height_m < LOW_TIDE_THRESHOLD_M
}

/// Render a prediction set as a `pcal` day file.
///
/// ```text
/// 6/1*  00:17 Low 0.1 m
/// 6/1  06:40 High 3.2 m
///
/// note/1 all Tide Station: Point Roberts, WA
/// ```
pub fn day_file(set: &CanonicalPredictionSet) -> String {
    let mut out = String::new();
    for event in set.events() {
        let marker = if is_emphasized(event) { "*" } else { "" };
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{}/{}{}  {} {} {:.1} m",
            event.time.format("%-m"),
            event.time.format("%-d"),
            marker,
            event.time.format("%H:%M"),
            event.kind,
            event.height_m,
        );
    }
    let _ = write!(out, "\nnote/1 all Tide Station: {}\n", set.station_name());
    out
}

/// Make a station name safe to use in a filename.
///
/// Path separators, shell metacharacters, commas and spaces become `_`,
/// runs of `_` collapse, and the result is trimmed to at most 100
/// characters. An empty result becomes `unknown`.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ',' | ' ' => '_',
            c => c,
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed: String = out.trim_matches('_').chars().take(MAX_NAME_LEN).collect();
    let trimmed = trimmed.trim_end_matches('_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Download filename for a station's calendar.
pub fn artifact_filename(station_name: &str, period: MonthRef) -> String {
    format!(
        "tide_calendar_{}_{:04}_{:02}.pdf",
        sanitize_filename(station_name),
        period.year(),
        period.month()
    )
}
