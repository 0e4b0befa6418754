//! Calendar generation service.
//!
//! The orchestration layer the HTTP handlers call into.

mod calendar;
mod error;

pub use calendar::{CalendarArtifact, TideCalendarService};
pub use error::CalendarError;
