//! # serp-harvest
//!
//! Harvests result listings from a search engine's result pages as seen
//! from a given location, and lists historical captures from a web archive.
//!
//! A harvest:
//!
//! - Resolves a coordinate from a location name or an explicit point,
//!   optionally displaced into a distance ring
//! - Pages through results sequentially, retrying failed page fetches
//! - Either collects up to `max_results` items, or stops at the first
//!   item whose URL matches a target pattern
//!
//! ## Example
//!
//! ```rust,no_run
//! use serp_harvest::{Coordinate, GoogleSearch, SearchConfig, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let search = GoogleSearch::new(SearchConfig::default())?;
//!
//!     let request = SearchRequest::new("coffee roasters", Coordinate::new(52.52, 13.405))
//!         .with_target("*.example.com")
//!         .with_distance(0.0, 5_000.0);
//!
//!     match search.search(&request).await?.found() {
//!         Some(item) => println!("found at #{}", item.position),
//!         None => println!("not found"),
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod query;
mod result;
mod search;

pub mod archive;
pub mod fetcher;
pub mod fetcher_http;
pub mod gate;
pub mod geo;
pub mod parser;
pub mod proxy;
pub mod target;

pub use archive::{ArchiveOrg, CdxRecord};
pub use config::{ArchiveConfig, SearchConfig};
pub use error::{Result, SearchError};
pub use gate::{AdmissionGate, GatePermit};
pub use geo::{Coordinate, GeoDataset, StaticGeoDataset};
pub use query::{build_search_url, Location, SearchRequest, DEFAULT_PAGE_SIZE};
pub use result::{ResultItem, SearchOutcome};
pub use search::GoogleSearch;
pub use target::TargetPattern;
