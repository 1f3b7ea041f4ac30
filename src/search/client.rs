use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::{SearchError, SearchPage};
use crate::config::HarvestConfig;
use crate::retry::RetryPolicy;

/// Default search sort order.
const DEFAULT_SORT: &str = "downloads desc";

/// Fields requested for every search document.
const FIELDS: [&str; 3] = ["identifier", "title", "language"];

/// Client for `advancedsearch.php`.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    endpoint: Url,
    sort: String,
    retry: RetryPolicy,
}

impl SearchClient {
    /// Creates a client for `endpoint` with the default sort and retry policy.
    #[must_use]
    pub fn new(http: Client, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            sort: DEFAULT_SORT.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a client from the harvest configuration.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `search_url` is not a valid URL.
    pub fn from_config(http: Client, config: &HarvestConfig) -> Result<Self, url::ParseError> {
        Ok(Self::new(http, Url::parse(&config.search_url)?)
            .with_sort(config.sort.clone())
            .with_retry_policy(config.retry_policy()))
    }

    /// Overrides the sort order.
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the request URL for one page.
    #[must_use]
    pub fn page_url(&self, query: &str, page: u32, rows: u32) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            for field in FIELDS {
                pairs.append_pair("fl[]", field);
            }
            pairs
                .append_pair("output", "json")
                .append_pair("rows", &rows.to_string())
                .append_pair("page", &page.to_string());
            if !self.sort.is_empty() {
                pairs.append_pair("sort[]", &self.sort);
            }
        }
        url
    }

    /// Fetches one 1-based page of results, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] once retries are exhausted or on a permanent failure.
    #[instrument(skip(self))]
    pub async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        rows: u32,
    ) -> Result<SearchPage, SearchError> {
        let url = self.page_url(query, page, rows);
        let search = self
            .retry
            .run("search", || self.fetch_once(&url))
            .await?;
        debug!(
            items = search.items.len(),
            total = search.total,
            "search page fetched"
        );
        Ok(search)
    }

    async fn fetch_once(&self, url: &Url) -> Result<SearchPage, SearchError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::http_status(url.as_str(), status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SearchError::from_reqwest(url.as_str(), e))?;
        SearchPage::from_json(&body).map_err(|e| SearchError::malformed(url.as_str(), e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn client(base: &str) -> SearchClient {
        let endpoint = Url::parse(&format!("{base}/advancedsearch.php")).unwrap();
        SearchClient::new(Client::new(), endpoint)
            .with_retry_policy(RetryPolicy::with_max_attempts(2).with_base_delay(Duration::ZERO))
    }

    #[test]
    fn test_page_url_carries_all_parameters() {
        let client = client("https://archive.org");
        let url = client.page_url("Islamic books", 3, 100);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        let has = |k: &str, v: &str| pairs.iter().any(|(pk, pv)| pk == k && pv == v);
        assert!(has("q", "Islamic books"));
        assert!(has("fl[]", "identifier"));
        assert!(has("fl[]", "title"));
        assert!(has("fl[]", "language"));
        assert!(has("output", "json"));
        assert!(has("rows", "100"));
        assert!(has("page", "3"));
        assert!(has("sort[]", "downloads desc"));
    }

    #[tokio::test]
    async fn test_fetch_page_decodes_docs_and_total() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/advancedsearch.php"))
            .and(query_param("page", "1"))
            .and(query_param("rows", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"numFound": 7, "docs": [
                    {"identifier": "a", "title": "A", "language": "Arabic"},
                    {"identifier": "b", "title": "B", "language": ["English"]}
                ]}
            })))
            .mount(&server)
            .await;

        let page = client(&server.uri()).fetch_page("q", 1, 2).await.unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].identifier, "b");
    }

    #[tokio::test]
    async fn test_fetch_page_retries_server_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": {"numFound": 0, "docs": []}})),
            )
            .mount(&server)
            .await;

        let page = client(&server.uri()).fetch_page("q", 1, 10).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_malformed_body_is_not_retried() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let error = client(&server.uri()).fetch_page("q", 1, 10).await.unwrap_err();
        assert!(matches!(error, SearchError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_page_client_error_status() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let error = client(&server.uri()).fetch_page("q", 1, 10).await.unwrap_err();
        assert!(matches!(error, SearchError::HttpStatus { status: 400, .. }));
    }
}
