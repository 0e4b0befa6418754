//! Calendar generation error types.

use crate::adapters::AdapterError;
use crate::cache::CacheError;
use crate::domain::{InvalidPeriod, Source};
use crate::render::RenderError;
use crate::resolve::ResolveError;
use crate::retry::RetryError;

/// Everything that can stop a calendar from being produced.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// Year or month out of range
    #[error(transparent)]
    InvalidPeriod(#[from] InvalidPeriod),

    /// No stations are loaded
    #[error("station directory is empty")]
    DirectoryEmpty,

    /// The query matched nothing, or too many stations
    #[error(transparent)]
    Unresolvable(ResolveError),

    /// The resolved identifier is not one the provider accepts
    #[error("{identifier:?} is not a valid {provider} station identifier")]
    InvalidIdentifierFormat { identifier: String, provider: Source },

    /// The provider kept failing transiently
    #[error("upstream unavailable after {attempts} attempts: {last}")]
    UpstreamTransient {
        attempts: u32,
        #[source]
        last: AdapterError,
    },

    /// The provider refused or had nothing for the request
    #[error("upstream error: {0}")]
    UpstreamTerminal(#[source] AdapterError),

    /// The provider's answer could not be read
    #[error("upstream payload could not be parsed: {0}")]
    ParseFailure(#[source] AdapterError),

    /// The render pipeline failed
    #[error("render failed: {0}")]
    RenderFailure(#[from] RenderError),

    /// The artifact could not be stored or read
    #[error("artifact cache failed: {0}")]
    CacheIo(#[from] CacheError),
}

impl CalendarError {
    /// Stable short name for logs and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CalendarError::InvalidPeriod(_) => "invalid_period",
            CalendarError::DirectoryEmpty => "directory_empty",
            CalendarError::Unresolvable(ResolveError::Ambiguous { .. }) => "ambiguous",
            CalendarError::Unresolvable(_) => "no_match",
            CalendarError::InvalidIdentifierFormat { .. } => "invalid_identifier",
            CalendarError::UpstreamTransient { .. } => "upstream_unavailable",
            CalendarError::UpstreamTerminal(_) => "upstream_error",
            CalendarError::ParseFailure(_) => "parse_failure",
            CalendarError::RenderFailure(_) => "render_failure",
            CalendarError::CacheIo(_) => "cache_io",
        }
    }
}

impl From<ResolveError> for CalendarError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::DirectoryEmpty => CalendarError::DirectoryEmpty,
            other => CalendarError::Unresolvable(other),
        }
    }
}

impl From<AdapterError> for CalendarError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::InvalidIdentifier {
                identifier,
                provider,
            } => CalendarError::InvalidIdentifierFormat {
                identifier,
                provider,
            },
            e @ AdapterError::Parse { .. } => CalendarError::ParseFailure(e),
            e => CalendarError::UpstreamTerminal(e),
        }
    }
}

impl From<RetryError<AdapterError>> for CalendarError {
    fn from(e: RetryError<AdapterError>) -> Self {
        match e {
            RetryError::Exhausted { attempts, last } => {
                CalendarError::UpstreamTransient { attempts, last }
            }
            RetryError::Terminal(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MonthRef;

    #[test]
    fn resolve_errors() {
        assert!(matches!(
            CalendarError::from(ResolveError::DirectoryEmpty),
            CalendarError::DirectoryEmpty
        ));

        let err = CalendarError::from(ResolveError::NoMatch {
            query: "nowhere".into(),
        });
        assert_eq!(err.kind(), "no_match");

        let err = CalendarError::from(ResolveError::Ambiguous {
            query: "point".into(),
            candidates: Vec::new(),
        });
        assert_eq!(err.kind(), "ambiguous");
    }

    #[test]
    fn retry_errors() {
        let err = CalendarError::from(RetryError::Exhausted {
            attempts: 3,
            last: AdapterError::Status {
                status: 503,
                message: String::new(),
            },
        });
        assert!(matches!(err, CalendarError::UpstreamTransient { attempts: 3, .. }));

        let err = CalendarError::from(RetryError::Terminal(AdapterError::NoData {
            station: "9449639".into(),
            period: MonthRef::new(2024, 6).unwrap(),
        }));
        assert_eq!(err.kind(), "upstream_error");

        let err = CalendarError::from(RetryError::Terminal(AdapterError::parse("bad", "{")));
        assert_eq!(err.kind(), "parse_failure");

        let err = CalendarError::from(RetryError::Terminal(AdapterError::InvalidIdentifier {
            identifier: "abc".into(),
            provider: Source::Noaa,
        }));
        assert_eq!(err.kind(), "invalid_identifier");
    }
}
