//! Station directory error types.

/// Errors that can occur while loading or syncing station data.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Listing endpoint returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Bundled dataset could not be read
    #[error("dataset error in {path}: {source}")]
    Dataset {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Cache operation failed
    #[error("cache error: {message}")]
    Cache { message: String },

    /// Snapshot file could not be written
    #[error("snapshot write failed: {0}")]
    SnapshotWrite(#[from] crate::cache::CacheError),

    /// Listing answered but held no station we can serve
    #[error("listing contained no usable stations")]
    EmptyListing,

    /// No listing endpoint is configured
    #[error("no listing endpoints configured")]
    NoEndpoints,
}
