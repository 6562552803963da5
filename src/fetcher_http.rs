//! HTTP transport using reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::fetcher::Transport;
use crate::proxy::ProxyConfig;
use crate::{Result, SearchError};

/// Settings a transport is built from; kept so a proxied copy can be made.
#[derive(Debug, Clone)]
struct TransportSettings {
    user_agent: String,
    timeout: Duration,
    proxy: Option<ProxyConfig>,
}

/// A transport backed by a keep-alive reqwest client.
///
/// Clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    settings: TransportSettings,
}

impl HttpTransport {
    /// Creates a transport with the given user agent and timeout.
    pub fn new(
        user_agent: impl Into<String>,
        timeout: Duration,
        proxy: Option<ProxyConfig>,
    ) -> Result<Self> {
        Self::from_settings(TransportSettings {
            user_agent: user_agent.into(),
            timeout,
            proxy,
        })
    }

    fn from_settings(settings: TransportSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = &settings.proxy {
            debug!("Using proxy: {}", proxy);
            builder = builder.proxy(proxy.to_reqwest()?);
        }

        let client = builder
            .build()
            .map_err(|e| SearchError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    /// Creates a transport around an existing reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            settings: TransportSettings {
                user_agent: String::new(),
                timeout: Duration::from_secs(30),
                proxy: None,
            },
        }
    }

    /// Proxy this transport routes through, if any.
    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.settings.proxy.as_ref()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<String> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(body)
    }

    fn with_proxy(&self, proxy: &ProxyConfig) -> Result<Arc<dyn Transport>> {
        let settings = TransportSettings {
            proxy: Some(proxy.clone()),
            ..self.settings.clone()
        };
        Ok(Arc::new(Self::from_settings(settings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ProxyProtocol;

    #[test]
    fn test_http_transport_new() {
        let transport = HttpTransport::new("test-agent", Duration::from_secs(5), None).unwrap();
        assert!(transport.proxy().is_none());
    }

    #[test]
    fn test_http_transport_with_proxy() {
        let proxy = ProxyConfig::new("127.0.0.1", 1080).with_protocol(ProxyProtocol::Socks5);
        let transport =
            HttpTransport::new("test-agent", Duration::from_secs(5), Some(proxy.clone())).unwrap();
        assert_eq!(transport.proxy(), Some(&proxy));
    }

    #[test]
    fn test_http_transport_with_client() {
        let client = Client::builder().user_agent("test-agent").build().unwrap();
        let transport = HttpTransport::with_client(client);
        assert!(transport.proxy().is_none());
    }

    #[test]
    fn test_with_proxy_builds_new_transport() {
        let transport = HttpTransport::new("test-agent", Duration::from_secs(5), None).unwrap();
        let proxied = transport.with_proxy(&ProxyConfig::new("127.0.0.1", 8080));
        assert!(proxied.is_ok());
    }

    #[tokio::test]
    async fn test_get_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("cookie", "UULE=a+abc")
            .with_status(200)
            .with_body("<html>hello</html>")
            .create_async()
            .await;

        let transport = HttpTransport::new("test-agent", Duration::from_secs(5), None).unwrap();
        let headers = vec![("cookie".to_string(), "UULE=a+abc".to_string())];
        let body = transport
            .get(&format!("{}/page", server.url()), &headers)
            .await
            .unwrap();

        assert_eq!(body, "<html>hello</html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_maps_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let transport = HttpTransport::new("test-agent", Duration::from_secs(5), None).unwrap();
        let err = transport
            .get(&format!("{}/missing", server.url()), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Status { status: 429, .. }));
    }
}
