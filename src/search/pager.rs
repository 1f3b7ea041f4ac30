use tracing::{info, warn};

use super::{SearchClient, SearchError, SearchPage};
use crate::config::HarvestConfig;
use crate::throttle::Throttle;

/// Outcome of one pager step.
#[derive(Debug)]
pub enum PagerEvent {
    /// A page with at least one document.
    Page {
        /// 1-based page number.
        number: u32,
        /// The decoded page.
        page: SearchPage,
    },
    /// A page that failed after retries; the pager moves on to the next one.
    Failed {
        /// 1-based page number.
        number: u32,
        /// Why the page failed.
        error: SearchError,
    },
}

/// Walks the pages of one query.
///
/// Stops when `page * rows >= numFound`, when a page comes back empty, after
/// `max_pages` pages, or after `max_consecutive_errors` failed pages in a row.
/// Every request after the first waits for the API delay; the wait is doubled
/// after a failed page.
#[derive(Debug)]
pub struct SearchPager {
    client: SearchClient,
    query: String,
    rows: u32,
    max_pages: u32,
    max_consecutive_errors: u32,
    throttle: Throttle,
    next_page: u32,
    total: Option<u64>,
    consecutive_errors: u32,
    finished: bool,
}

impl SearchPager {
    /// Creates a pager over the configured query and paging settings.
    #[must_use]
    pub fn new(client: SearchClient, config: &HarvestConfig) -> Self {
        Self {
            client,
            query: config.query.clone(),
            rows: config.rows_per_page.max(1),
            max_pages: config.max_pages,
            max_consecutive_errors: config.max_consecutive_page_errors.max(1),
            throttle: Throttle::new(config.api_delay()),
            next_page: 1,
            total: None,
            consecutive_errors: 0,
            finished: false,
        }
    }

    /// Total result count reported by the last successful page.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Number of the page the next call will request.
    #[must_use]
    pub fn next_page_number(&self) -> u32 {
        self.next_page
    }

    /// Fetches the next page, or returns `None` once paging is over.
    pub async fn next(&mut self) -> Option<PagerEvent> {
        if self.finished || self.exhausted() {
            self.finished = true;
            return None;
        }

        let number = self.next_page;
        self.next_page += 1;
        self.throttle.wait().await;

        match self.client.fetch_page(&self.query, number, self.rows).await {
            Ok(page) => {
                self.consecutive_errors = 0;
                self.total = Some(page.total);
                if page.is_empty() {
                    info!(page = number, "empty search page, stopping");
                    self.finished = true;
                    return None;
                }
                Some(PagerEvent::Page { number, page })
            }
            Err(error) => {
                self.consecutive_errors += 1;
                self.throttle.back_off();
                if self.consecutive_errors >= self.max_consecutive_errors {
                    warn!(
                        page = number,
                        failures = self.consecutive_errors,
                        "too many consecutive search failures, stopping"
                    );
                    self.finished = true;
                }
                Some(PagerEvent::Failed { number, error })
            }
        }
    }

    fn exhausted(&self) -> bool {
        let fetched = self.next_page - 1;
        if fetched >= self.max_pages {
            info!(max_pages = self.max_pages, "page limit reached");
            return true;
        }
        match self.total {
            Some(total) => u64::from(fetched) * u64::from(self.rows) >= total,
            None => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use reqwest::Client;
    use url::Url;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::retry::RetryPolicy;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    fn config(rows: u32) -> HarvestConfig {
        HarvestConfig {
            rows_per_page: rows,
            api_delay_ms: 0,
            ..HarvestConfig::default()
        }
    }

    fn client(server: &MockServer) -> SearchClient {
        SearchClient::new(Client::new(), Url::parse(&server.uri()).unwrap())
            .with_retry_policy(RetryPolicy::no_retry().with_base_delay(Duration::ZERO))
    }

    fn docs(n: usize, total: u64) -> serde_json::Value {
        let docs: Vec<_> = (0..n)
            .map(|i| serde_json::json!({"identifier": format!("id-{i}"), "language": "Arabic"}))
            .collect();
        serde_json::json!({"response": {"numFound": total, "docs": docs}})
    }

    async fn mount_page(server: &MockServer, page: u32, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn drain(pager: &mut SearchPager) -> (Vec<u32>, Vec<u32>) {
        let mut pages = Vec::new();
        let mut failures = Vec::new();
        while let Some(event) = pager.next().await {
            match event {
                PagerEvent::Page { number, .. } => pages.push(number),
                PagerEvent::Failed { number, .. } => failures.push(number),
            }
        }
        (pages, failures)
    }

    #[tokio::test]
    async fn test_pager_stops_at_ceil_of_total() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_page(&server, 1, docs(2, 5)).await;
        mount_page(&server, 2, docs(2, 5)).await;
        mount_page(&server, 3, docs(1, 5)).await;

        let mut pager = SearchPager::new(client(&server), &config(2));
        let (pages, failures) = drain(&mut pager).await;

        assert_eq!(pages, vec![1, 2, 3]);
        assert!(failures.is_empty());
        assert_eq!(pager.total(), Some(5));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_pager_stops_on_empty_page_despite_total() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_page(&server, 1, docs(2, 1000)).await;
        mount_page(&server, 2, docs(0, 1000)).await;

        let mut pager = SearchPager::new(client(&server), &config(2));
        let (pages, _) = drain(&mut pager).await;

        assert_eq!(pages, vec![1]);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pager_respects_max_pages() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(docs(1, 1_000_000)))
            .mount(&server)
            .await;

        let client = client(&server);
        let config = HarvestConfig {
            max_pages: 2,
            ..config(1)
        };
        let mut pager = SearchPager::new(client, &config);
        let (pages, _) = drain(&mut pager).await;
        assert_eq!(pages, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_pager_skips_failed_page_and_continues() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_page(&server, 1, docs(1, 3)).await;
        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_page(&server, 3, docs(1, 3)).await;

        let mut pager = SearchPager::new(client(&server), &config(1));
        let (pages, failures) = drain(&mut pager).await;

        assert_eq!(pages, vec![1, 3]);
        assert_eq!(failures, vec![2]);
    }

    #[tokio::test]
    async fn test_pager_gives_up_after_consecutive_failures() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client(&server);
        let config = HarvestConfig {
            max_consecutive_page_errors: 2,
            ..config(10)
        };
        let mut pager = SearchPager::new(client, &config);
        let (pages, failures) = drain(&mut pager).await;

        assert!(pages.is_empty());
        assert_eq!(failures, vec![1, 2]);
        assert!(pager.next().await.is_none());
    }
}
