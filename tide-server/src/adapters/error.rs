//! Adapter error types.

use crate::domain::{MonthRef, Source};

/// Errors from a single upstream prediction call.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status code
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Upstream answered but has no predictions for the period
    #[error("no predictions for station {station} in {period}")]
    NoData { station: String, period: MonthRef },

    /// Response body could not be turned into predictions
    #[error("malformed upstream payload: {message}")]
    Parse {
        message: String,
        body: Option<String>,
    },

    /// Identifier does not match the provider's grammar
    #[error("{identifier:?} is not a valid {provider} station identifier")]
    InvalidIdentifier { identifier: String, provider: Source },

    /// Provider lookup found no station for the code
    #[error("no {provider} station has code {code}")]
    UnknownStation { code: String, provider: Source },
}

impl AdapterError {
    /// Whether retrying the same call may succeed.
    ///
    /// Connect failures, timeouts, 429 and the gateway-class 5xx statuses
    /// are transient. Everything else, including 500, is terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            AdapterError::Http(e) => e.is_timeout() || e.is_connect(),
            AdapterError::Status { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    pub(crate) fn parse(message: impl Into<String>, body: &str) -> Self {
        AdapterError::Parse {
            message: message.into(),
            body: Some(body.chars().take(500).collect()),
        }
    }
}
