//! Page transport abstraction and the bounded retry loop around it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::proxy::ProxyConfig;
use crate::{Result, SearchError};

/// Trait for fetching a page body over the network.
///
/// Implementations report non-success statuses as
/// [`SearchError::Status`] and network failures as [`SearchError::Http`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a GET and returns the body of a successful response.
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<String>;

    /// Returns a transport with the same settings routed through `proxy`.
    fn with_proxy(&self, proxy: &ProxyConfig) -> Result<Arc<dyn Transport>>;
}

/// Attempt counter for a single page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub max_retries: u32,
}

impl RetryState {
    /// A bound of zero still allows one attempt.
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_retries: max_retries.max(1),
        }
    }

    /// Records the start of an attempt; false once the bound is used up.
    pub fn next_attempt(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.attempt += 1;
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_retries
    }
}

/// Fetches `url`, retrying failed attempts up to `max_retries` in total.
///
/// Attempts run strictly one after another. When every attempt fails the
/// error of the last one is returned unchanged.
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    url: &str,
    headers: &[(String, String)],
    max_retries: u32,
) -> Result<String> {
    let mut state = RetryState::new(max_retries);
    let mut last_error = None;

    while state.next_attempt() {
        match transport.get(url, headers).await {
            Ok(body) => {
                debug!("Fetched {} on attempt {}", url, state.attempt);
                return Ok(body);
            }
            Err(e) => {
                warn!(
                    "Fetch attempt {}/{} for {} failed: {}",
                    state.attempt, state.max_retries, url, e
                );
                last_error = Some(e);
            }
        }
    }

    warn!("Giving up on {} after {} attempts", url, state.attempt);
    Err(last_error.unwrap_or_else(|| SearchError::Other(format!("no attempt made for {}", url))))
}
