//! Search request representation and result page URL construction.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::proxy::ProxyConfig;

/// Results requested per page unless the client is configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default cap on collected results.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Where a harvest is run from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    /// Location name resolved through a geo dataset.
    Named(String),
    /// Explicit coordinate.
    Coordinate(Coordinate),
}

impl From<Coordinate> for Location {
    fn from(coordinate: Coordinate) -> Self {
        Location::Coordinate(coordinate)
    }
}

impl From<&str> for Location {
    fn from(name: &str) -> Self {
        Location::Named(name.to_string())
    }
}

impl From<String> for Location {
    fn from(name: String) -> Self {
        Location::Named(name)
    }
}

/// Parameters of a single harvest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The search terms.
    pub keyword: String,
    /// URL pattern to stop at; switches the harvest to target mode.
    pub target: Option<String>,
    /// Maximum number of results collected.
    pub max_results: usize,
    pub location: Location,
    /// Inner radius of the sampling ring, in meters.
    pub min_distance: Option<f64>,
    /// Outer radius of the sampling ring, in meters.
    pub max_distance: Option<f64>,
    /// Proxy overriding the client's one for this harvest.
    #[serde(skip)]
    pub proxy: Option<ProxyConfig>,
    /// Interface language (e.g., "en").
    pub language: Option<String>,
}

impl SearchRequest {
    /// Creates a collection-mode request.
    pub fn new(keyword: impl Into<String>, location: impl Into<Location>) -> Self {
        Self {
            keyword: keyword.into(),
            target: None,
            max_results: DEFAULT_MAX_RESULTS,
            location: location.into(),
            min_distance: None,
            max_distance: None,
            proxy: None,
            language: None,
        }
    }

    /// Sets the target pattern.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the result cap.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Samples the location from the ring `[min_distance, max_distance]`
    /// meters around the given coordinate.
    pub fn with_distance(mut self, min_distance: f64, max_distance: f64) -> Self {
        self.min_distance = Some(min_distance);
        self.max_distance = Some(max_distance);
        self
    }

    /// Sets a per-request proxy.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets the interface language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Builds the URL of one result page.
///
/// `start` is left out for the first page and `hl` only appears when a
/// language is given.
pub fn build_search_url(
    base_url: &str,
    keyword: &str,
    page_size: usize,
    offset: usize,
    language: Option<&str>,
) -> String {
    let mut url = format!(
        "{}?q={}&num={}",
        base_url,
        urlencoding::encode(keyword),
        page_size
    );
    if offset > 0 {
        url.push_str(&format!("&start={}", offset));
    }
    if let Some(language) = language {
        url.push_str(&format!("&hl={}", urlencoding::encode(language)));
    }
    url
}
