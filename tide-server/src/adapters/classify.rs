//! High/low classification for providers that report bare extrema.
//!
//! The CHS `wlp-hilo` series lists turning points without saying which
//! are highs and which are lows, so the kind is recovered from the shape
//! of the height sequence.

use crate::domain::TideKind;

/// Classify each value of a time-ordered height sequence.
///
/// With both neighbours present, a strict local maximum is high and a
/// strict local minimum is low. Plateaus, monotone runs and the two ends
/// fall back to comparing with the previous value (greater is high), or
/// with the next value when there is no previous one. A lone value is low.
///
/// # Examples
///
/// ```
/// use tide_server::adapters::classify_extrema;
/// use tide_server::domain::TideKind::{High, Low};
///
/// assert_eq!(classify_extrema(&[0.5, 3.1, 0.2, 2.9]), vec![Low, High, Low, High]);
/// ```
pub fn classify_extrema(values: &[f64]) -> Vec<TideKind> {
    (0..values.len())
        .map(|i| {
            let value = values[i];
            let prev = i.checked_sub(1).map(|p| values[p]);
            let next = values.get(i + 1).copied();

            if let (Some(prev), Some(next)) = (prev, next) {
                if value > prev && value > next {
                    return TideKind::High;
                }
                if value < prev && value < next {
                    return TideKind::Low;
                }
            }

            match (prev, next) {
                (Some(prev), _) => higher_is_high(value, prev),
                (None, Some(next)) => higher_is_high(value, next),
                (None, None) => TideKind::Low,
            }
        })
        .collect()
}

fn higher_is_high(value: f64, other: f64) -> TideKind {
    if value > other {
        TideKind::High
    } else {
        TideKind::Low
    }
}
