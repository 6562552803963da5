//! Error types for the harvester.

use thiserror::Error;

/// Result type alias for harvest operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while harvesting results or querying the archive.
#[derive(Error, Debug)]
pub enum SearchError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("HTTP {status} returned by {url}")]
    Status { status: u16, url: String },

    /// The request cannot be served with the given configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Proxy specification could not be parsed or applied.
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Returns true for failures raised by the network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}
