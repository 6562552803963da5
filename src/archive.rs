//! Web archive client: capture index listing and snapshot retrieval.
//!
//! All requests of one client go through its [`AdmissionGate`], so at most
//! `max_threads` of them are outstanding at any time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ArchiveConfig;
use crate::fetcher::Transport;
use crate::fetcher_http::HttpTransport;
use crate::gate::AdmissionGate;
use crate::proxy::ProxyConfig;
use crate::{Result, SearchError};

/// One row of the capture index, keyed by the header row's field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CdxRecord {
    fields: HashMap<String, String>,
}

impl CdxRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Capture timestamp (`YYYYMMDDhhmmss`).
    pub fn timestamp(&self) -> Option<&str> {
        self.get("timestamp")
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }
}

/// Zips each value row with the header row.
fn parse_cdx(body: &str) -> Result<Vec<CdxRecord>> {
    let rows: Vec<Vec<String>> = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("invalid capture index: {}", e)))?;

    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    Ok(rows
        .map(|row| CdxRecord {
            fields: header.iter().cloned().zip(row).collect(),
        })
        .collect())
}

/// Client for the web archive.
pub struct ArchiveOrg {
    config: ArchiveConfig,
    transport: Arc<dyn Transport>,
    gate: AdmissionGate,
}

impl ArchiveOrg {
    /// Creates a client with an HTTP transport built from `config`.
    pub fn new(config: ArchiveConfig) -> Result<Self> {
        let transport = HttpTransport::new(
            config.user_agent.clone(),
            Duration::from_secs(config.timeout),
            config.proxy.clone(),
        )?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(config: ArchiveConfig, transport: Arc<dyn Transport>) -> Self {
        let gate = AdmissionGate::new(config.max_threads);
        Self {
            config,
            transport,
            gate,
        }
    }

    /// Routes later requests through `proxy`.
    pub fn set_proxy(&mut self, proxy: ProxyConfig) -> Result<()> {
        self.transport = self.transport.with_proxy(&proxy)?;
        self.config.proxy = Some(proxy);
        Ok(())
    }

    /// The gate bounding this client's requests.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn index_url(&self, domain: &str) -> String {
        format!(
            "{}/cdx/search/cdx?url={}&matchType=exact&fl=timestamp&filter=statuscode:200&filter=mimetype:text/html&output=json&from=2010&collapse=timestamp:6",
            self.config.base_url, domain
        )
    }

    pub fn snapshot_url(&self, domain: &str, timestamp: &str) -> String {
        format!("{}/web/{}/{}/", self.config.base_url, timestamp, domain)
    }

    /// Lists successful HTML captures of `domain`, at most one per month.
    pub async fn get_index(&self, domain: &str) -> Result<Vec<CdxRecord>> {
        let body = self.fetch(&self.index_url(domain)).await?;
        let records = parse_cdx(&body)?;
        debug!("Archive index for {} has {} captures", domain, records.len());
        Ok(records)
    }

    /// Fetches the raw HTML of a capture.
    pub async fn get_snapshot(&self, domain: &str, timestamp: &str) -> Result<String> {
        self.fetch(&self.snapshot_url(domain, timestamp)).await
    }

    /// Fetches several captures of `domain` concurrently, at most
    /// `max_threads` at a time. Results are in the order of `timestamps`.
    pub async fn get_snapshots(&self, domain: &str, timestamps: &[String]) -> Vec<Result<String>> {
        join_all(
            timestamps
                .iter()
                .map(|timestamp| self.get_snapshot(domain, timestamp)),
        )
        .await
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.gate.run(self.transport.get(url, &[])).await
    }
}
