//! Harvest orchestration: pagination, target early-exit and result capping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::SearchConfig;
use crate::fetcher::{fetch_with_retry, Transport};
use crate::fetcher_http::HttpTransport;
use crate::geo::{encode_uule, resolve_coordinate, GeoDataset};
use crate::parser::{parse_page, ParsedPage};
use crate::query::build_search_url;
use crate::target::TargetPattern;
use crate::{Result, ResultItem, SearchError, SearchOutcome, SearchRequest};

/// What the controller does after consuming a page.
#[derive(Debug)]
enum PageStep {
    /// Target matched; the harvest ends with this item.
    Matched(ResultItem),
    /// Cap reached or no next page.
    Done,
    /// Fetch the following page.
    Continue,
}

/// Search result harvester.
///
/// Built once and shared; each [`search`](Self::search) call is an
/// independent harvest that only shares the transport's connection pool.
pub struct GoogleSearch {
    config: SearchConfig,
    transport: Arc<dyn Transport>,
    datasets: Option<Arc<dyn GeoDataset>>,
}

impl GoogleSearch {
    /// Creates a harvester with a keep-alive HTTP transport.
    pub fn new(config: SearchConfig) -> Result<Self> {
        let transport = HttpTransport::new(
            config.user_agent.clone(),
            Duration::from_secs(config.timeout),
            config.proxy.clone(),
        )?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a harvester over a caller-supplied transport.
    pub fn with_transport(config: SearchConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            datasets: None,
        }
    }

    /// Sets the dataset used to resolve named locations.
    pub fn with_datasets(mut self, datasets: Arc<dyn GeoDataset>) -> Self {
        self.datasets = Some(datasets);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs one harvest.
    ///
    /// In target mode the result is [`SearchOutcome::Found`] or
    /// [`SearchOutcome::NotFound`]; otherwise [`SearchOutcome::Collected`].
    /// A page that still fails after all retries fails the whole harvest
    /// and discards what was collected.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        if request.keyword.trim().is_empty() {
            return Err(SearchError::InvalidQuery("Keyword cannot be empty".into()));
        }
        if request.max_results == 0 {
            return Err(SearchError::InvalidQuery(
                "max_results must be at least 1".into(),
            ));
        }

        let target = request
            .target
            .as_deref()
            .map(TargetPattern::compile)
            .transpose()?;

        let coordinate = resolve_coordinate(
            &request.location,
            request.min_distance,
            request.max_distance,
            self.datasets.as_deref(),
        )
        .await?;
        let headers = vec![("cookie".to_string(), format!("UULE={}", encode_uule(&coordinate)))];

        let transport = match &request.proxy {
            Some(proxy) => self.transport.with_proxy(proxy)?,
            None => Arc::clone(&self.transport),
        };

        let start = Instant::now();
        let page_size = self.config.page_size.max(1);
        let mut collected = Vec::new();
        let mut offset = 0;

        loop {
            let url = build_search_url(
                &self.config.base_url,
                &request.keyword,
                page_size,
                offset,
                request.language.as_deref(),
            );
            debug!("Fetching result page at offset {}", offset);

            let html =
                fetch_with_retry(transport.as_ref(), &url, &headers, self.config.max_retries).await?;
            let page = parse_page(&html)?;

            match consume_page(page, &mut collected, target.as_ref(), request.max_results) {
                PageStep::Matched(item) => {
                    debug!(
                        "Target {} found at position {} in {}ms",
                        request.target.as_deref().unwrap_or_default(),
                        item.position,
                        start.elapsed().as_millis()
                    );
                    return Ok(SearchOutcome::Found(item));
                }
                PageStep::Done => break,
                PageStep::Continue => offset += page_size,
            }
        }

        debug!(
            "Harvest for '{}' ended with {} results in {}ms",
            request.keyword,
            collected.len(),
            start.elapsed().as_millis()
        );

        Ok(match target {
            Some(_) => SearchOutcome::NotFound,
            None => SearchOutcome::Collected(collected),
        })
    }
}

/// Numbers the page's entries after those already collected, tests each
/// against the target, and decides whether another page is needed.
fn consume_page(
    page: ParsedPage,
    collected: &mut Vec<ResultItem>,
    target: Option<&TargetPattern>,
    max_results: usize,
) -> PageStep {
    for entry in page.entries {
        let item = ResultItem {
            position: collected.len() + 1,
            title: entry.title,
            description: entry.description,
            url: entry.url,
        };

        if target.is_some_and(|pattern| pattern.is_match(&item)) {
            return PageStep::Matched(item);
        }

        collected.push(item);
        if collected.len() >= max_results {
            return PageStep::Done;
        }
    }

    if page.has_next {
        PageStep::Continue
    } else {
        PageStep::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Coordinate, Geotarget, GeotargetOptions};
    use crate::proxy::ProxyConfig;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves scripted responses in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<std::result::Result<String, u16>>>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<std::result::Result<String, u16>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<String> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), headers.to_vec()));
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Ok(body)) => Ok(body),
                Some(Err(status)) => Err(SearchError::Status {
                    status,
                    url: url.to_string(),
                }),
                None => Err(SearchError::Other("script exhausted".to_string())),
            }
        }

        fn with_proxy(&self, _proxy: &ProxyConfig) -> Result<Arc<dyn Transport>> {
            let remaining = self.responses.lock().unwrap().drain(..).collect::<Vec<_>>();
            Ok(ScriptedTransport::new(remaining))
        }
    }

    struct EmptyDataset;

    #[async_trait]
    impl GeoDataset for EmptyDataset {
        async fn get_geotarget(
            &self,
            _location: &str,
            _options: &GeotargetOptions,
        ) -> Result<Geotarget> {
            Ok(Geotarget::default())
        }
    }

    fn block(url: &str, title: &str) -> String {
        format!(
            r#"<div class="g"><div class="yuRUbf"><a href="{}"><h3>{}</h3></a></div><div class="IsZvec">about {}</div></div>"#,
            url, title, title
        )
    }

    fn page(urls: &[&str], has_next: bool) -> String {
        let blocks: String = urls
            .iter()
            .enumerate()
            .map(|(i, url)| block(url, &format!("Result {}", i)))
            .collect();
        let next = if has_next {
            r#"<a id="pnnext" href="/search?start=x">Next</a>"#
        } else {
            ""
        };
        format!("<html><body>{}{}</body></html>", blocks, next)
    }

    fn config(page_size: usize) -> SearchConfig {
        SearchConfig {
            page_size,
            max_retries: 3,
            ..Default::default()
        }
    }

    fn here() -> Coordinate {
        Coordinate::new(40.7128, -74.0060)
    }

    #[tokio::test]
    async fn test_target_found_on_second_page() {
        let transport = ScriptedTransport::new(vec![
            Ok(page(&["https://a.com/1", "https://b.com/2"], true)),
            Ok(page(&["https://shop.example.com/item", "https://c.com/4"], true)),
            Ok(page(&["https://never.com/"], false)),
        ]);
        let search = GoogleSearch::with_transport(config(2), transport.clone());

        let request = SearchRequest::new("widgets", here()).with_target("*.example.com");
        let outcome = search.search(&request).await.unwrap();

        let item = outcome.found().expect("target should be found");
        assert_eq!(item.position, 3);
        assert_eq!(item.url.as_deref(), Some("https://shop.example.com/item"));
        assert_eq!(transport.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_target_not_found() {
        let transport = ScriptedTransport::new(vec![
            Ok(page(&["https://a.com/1", "https://b.com/2"], true)),
            Ok(page(&["https://c.com/3"], false)),
        ]);
        let search = GoogleSearch::with_transport(config(2), transport.clone());

        let request = SearchRequest::new("widgets", here()).with_target("example.com");
        let outcome = search.search(&request).await.unwrap();

        assert_eq!(outcome, SearchOutcome::NotFound);
        assert_eq!(transport.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_target_mode_stops_at_cap() {
        let transport = ScriptedTransport::new(vec![
            Ok(page(&["https://a.com/1", "https://b.com/2"], true)),
            Ok(page(&["https://example.com/3"], false)),
        ]);
        let search = GoogleSearch::with_transport(config(2), transport.clone());

        let request = SearchRequest::new("widgets", here())
            .with_target("example.com")
            .with_max_results(2);
        let outcome = search.search(&request).await.unwrap();

        assert_eq!(outcome, SearchOutcome::NotFound);
        assert_eq!(transport.urls().len(), 1);
    }

    #[tokio::test]
    async fn test_collection_capped_mid_page() {
        let transport = ScriptedTransport::new(vec![
            Ok(page(&["https://1.com/", "https://2.com/", "https://3.com/", "https://4.com/"], true)),
            Ok(page(&["https://5.com/", "https://6.com/", "https://7.com/", "https://8.com/"], true)),
            Ok(page(&["https://9.com/", "https://10.com/"], false)),
        ]);
        let search = GoogleSearch::with_transport(config(4), transport.clone());

        let request = SearchRequest::new("widgets", here()).with_max_results(5);
        let items = search.search(&request).await.unwrap().into_items();

        let positions: Vec<_> = items.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
        assert_eq!(items[4].url.as_deref(), Some("https://5.com/"));
        assert_eq!(transport.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_stops_without_next_indicator() {
        let transport = ScriptedTransport::new(vec![Ok(page(
            &["https://1.com/", "https://2.com/"],
            false,
        ))]);
        let search = GoogleSearch::with_transport(config(100), transport.clone());

        let request = SearchRequest::new("widgets", here());
        let outcome = search.search(&request).await.unwrap();

        assert_eq!(outcome.items().len(), 2);
        assert_eq!(transport.urls().len(), 1);
    }

    #[tokio::test]
    async fn test_offsets_advance_by_page_size() {
        let transport = ScriptedTransport::new(vec![
            Ok(page(&["https://1.com/"], true)),
            Ok(page(&["https://2.com/"], true)),
            Ok(page(&["https://3.com/"], false)),
        ]);
        let search = GoogleSearch::with_transport(config(10), transport.clone());

        let request = SearchRequest::new("blue widgets", here()).with_language("fr");
        search.search(&request).await.unwrap();

        assert_eq!(
            transport.urls(),
            vec![
                "https://www.google.com/search?q=blue%20widgets&num=10&hl=fr",
                "https://www.google.com/search?q=blue%20widgets&num=10&start=10&hl=fr",
                "https://www.google.com/search?q=blue%20widgets&num=10&start=20&hl=fr",
            ]
        );
    }

    #[tokio::test]
    async fn test_sends_location_cookie() {
        let transport = ScriptedTransport::new(vec![Ok(page(&[], false))]);
        let search = GoogleSearch::with_transport(config(10), transport.clone());

        search
            .search(&SearchRequest::new("widgets", here()))
            .await
            .unwrap();

        let requests = transport.requests.lock().unwrap();
        let (_, headers) = &requests[0];
        assert_eq!(
            headers,
            &vec![("cookie".to_string(), format!("UULE={}", encode_uule(&here())))]
        );
    }

    #[tokio::test]
    async fn test_partial_items_keep_positions() {
        let html = r#"
            <div class="g"><h3>No link</h3></div>
            <div class="g"><div class="yuRUbf"><a href="https://x.com/">X</a></div></div>
        "#;
        let transport = ScriptedTransport::new(vec![Ok(html.to_string())]);
        let search = GoogleSearch::with_transport(config(10), transport);

        let items = search
            .search(&SearchRequest::new("widgets", here()))
            .await
            .unwrap()
            .into_items();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].position, 1);
        assert!(items[0].url.is_none());
        assert_eq!(items[1].position, 2);
        assert!(items[1].title.is_none());
    }

    #[tokio::test]
    async fn test_retries_then_continues() {
        let transport = ScriptedTransport::new(vec![
            Err(503),
            Err(500),
            Ok(page(&["https://1.com/"], false)),
        ]);
        let search = GoogleSearch::with_transport(config(10), transport.clone());

        let outcome = search
            .search(&SearchRequest::new("widgets", here()))
            .await
            .unwrap();

        assert_eq!(outcome.items().len(), 1);
        assert_eq!(transport.urls().len(), 3);
    }

    #[tokio::test]
    async fn test_page_failure_discards_collected() {
        let transport = ScriptedTransport::new(vec![
            Ok(page(&["https://1.com/"], true)),
            Err(503),
            Err(503),
            Err(429),
        ]);
        let search = GoogleSearch::with_transport(config(1), transport.clone());

        let err = search
            .search(&SearchRequest::new("widgets", here()))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Status { status: 429, .. }));
        assert_eq!(transport.urls().len(), 4);
    }

    #[tokio::test]
    async fn test_named_location_without_coordinates_fails_before_fetch() {
        let transport = ScriptedTransport::new(vec![Ok(page(&["https://1.com/"], false))]);
        let search = GoogleSearch::with_transport(config(10), transport.clone())
            .with_datasets(Arc::new(EmptyDataset));

        let err = search
            .search(&SearchRequest::new("widgets", "Nowhere"))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Configuration(_)));
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_named_location_resolved() {
        let dataset = crate::geo::StaticGeoDataset::new().with_area("New York", here(), 1_000.0);
        let transport = ScriptedTransport::new(vec![Ok(page(&["https://1.com/"], false))]);
        let search = GoogleSearch::with_transport(config(10), transport.clone())
            .with_datasets(Arc::new(dataset));

        let outcome = search
            .search(&SearchRequest::new("widgets", "new york"))
            .await
            .unwrap();

        assert_eq!(outcome.items().len(), 1);
        let requests = transport.requests.lock().unwrap();
        assert!(requests[0].1[0].1.starts_with("UULE=a+"));
    }

    #[tokio::test]
    async fn test_empty_keyword_rejected() {
        let transport = ScriptedTransport::new(vec![]);
        let search = GoogleSearch::with_transport(config(10), transport.clone());

        let err = search
            .search(&SearchRequest::new("   ", here()))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::InvalidQuery(_)));
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_max_results_rejected() {
        let transport = ScriptedTransport::new(vec![]);
        let search = GoogleSearch::with_transport(config(10), transport);

        let err = search
            .search(&SearchRequest::new("widgets", here()).with_max_results(0))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_per_request_proxy_uses_separate_transport() {
        let shared = ScriptedTransport::new(vec![Ok(page(&["https://1.com/"], false))]);
        let search = GoogleSearch::with_transport(config(10), shared.clone());

        let request =
            SearchRequest::new("widgets", here()).with_proxy(ProxyConfig::new("127.0.0.1", 8080));
        let outcome = search.search(&request).await.unwrap();

        assert_eq!(outcome.items().len(), 1);
        // the shared transport handed its script over and was never called
        assert!(shared.urls().is_empty());
    }

    #[test]
    fn test_consume_page_continue() {
        let page = ParsedPage {
            entries: vec![Default::default(), Default::default()],
            has_next: true,
        };
        let mut collected = Vec::new();
        assert!(matches!(
            consume_page(page, &mut collected, None, 10),
            PageStep::Continue
        ));
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn test_consume_page_numbers_after_existing() {
        let page = ParsedPage {
            entries: vec![Default::default()],
            has_next: false,
        };
        let mut collected = vec![ResultItem::new(1), ResultItem::new(2)];
        assert!(matches!(
            consume_page(page, &mut collected, None, 10),
            PageStep::Done
        ));
        assert_eq!(collected[2].position, 3);
    }
}
