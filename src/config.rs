//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::proxy::ProxyConfig;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Configuration for [`GoogleSearch`](crate::GoogleSearch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint; query parameters are appended to it.
    #[serde(default = "default_search_url")]
    pub base_url: String,
    /// Results requested per page (`num`).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Attempts per page before the harvest fails.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Proxy used by the shared transport.
    #[serde(skip)]
    pub proxy: Option<ProxyConfig>,
}

/// Configuration for [`ArchiveOrg`](crate::ArchiveOrg).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Archive host, without trailing slash.
    #[serde(default = "default_archive_url")]
    pub base_url: String,
    /// Maximum concurrent requests in flight.
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(skip)]
    pub proxy: Option<ProxyConfig>,
}

fn default_search_url() -> String {
    "https://www.google.com/search".to_string()
}

fn default_archive_url() -> String {
    "https://web.archive.org".to_string()
}

fn default_page_size() -> usize {
    crate::query::DEFAULT_PAGE_SIZE
}

fn default_max_retries() -> u32 {
    10
}

fn default_max_threads() -> usize {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            page_size: default_page_size(),
            max_retries: default_max_retries(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            proxy: None,
        }
    }
}

impl SearchConfig {
    /// Sets the proxy for the shared transport.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets the retry bound per page.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: default_archive_url(),
            max_threads: default_max_threads(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            proxy: None,
        }
    }
}

impl ArchiveConfig {
    /// Sets the proxy.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets the concurrency cap.
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.base_url, "https://www.google.com/search");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("Chrome"));
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_archive_config_default() {
        let config = ArchiveConfig::default();
        assert_eq!(config.base_url, "https://web.archive.org");
        assert_eq!(config.max_threads, 10);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_search_config_deserialization_defaults() {
        let json = r#"{"page_size":10}"#;
        let config: SearchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.max_retries, 10); // default
        assert_eq!(config.base_url, "https://www.google.com/search"); // default
    }

    #[test]
    fn test_search_config_serialization_skips_proxy() {
        let config = SearchConfig::default().with_proxy(ProxyConfig::new("127.0.0.1", 8080));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"page_size\":100"));
        assert!(!json.contains("127.0.0.1"));
    }

    #[test]
    fn test_builders() {
        let search = SearchConfig::default().with_max_retries(3);
        assert_eq!(search.max_retries, 3);

        let archive = ArchiveConfig::default()
            .with_max_threads(2)
            .with_proxy(ProxyConfig::new("127.0.0.1", 1080));
        assert_eq!(archive.max_threads, 2);
        assert_eq!(archive.proxy.unwrap().port, 1080);
    }
}
