//! File resolution: which PDFs does an archive item contain?
//!
//! [`FileResolver::list_pdf_files`] asks the metadata API for the item's file
//! listing and keeps the entries whose name ends in a configured extension.
//! When the listing has none, the item's download page is scraped for links.

mod error;
mod files;
mod html;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use error::MetadataError;
pub use files::ListedFile;
pub use html::{PageLink, extract_links};

use crate::config::HarvestConfig;
use crate::retry::RetryPolicy;
use files::FileListing;
use html::has_extension;

/// Format inferred from a file name's extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFormat {
    /// `.pdf`
    Pdf,
    /// Any other extension, lowercased without the dot (empty when none).
    Other(String),
}

impl FileFormat {
    /// Infers the format from `name`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let last = name.rsplit('/').next().unwrap_or(name);
        match last.rsplit_once('.') {
            Some((_, ext)) if ext.eq_ignore_ascii_case("pdf") => Self::Pdf,
            Some((_, ext)) => Self::Other(ext.to_lowercase()),
            None => Self::Other(String::new()),
        }
    }
}

/// One downloadable file of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// Parent item identifier.
    pub identifier: String,
    /// File name as listed by the archive.
    pub name: String,
    /// Format inferred from the extension.
    pub format: FileFormat,
    /// Declared size, when the listing has one.
    pub size: Option<u64>,
    /// Where to fetch the file from.
    pub url: Url,
}

/// Builds `{base}/{identifier}/{name}` with every segment percent-encoded.
///
/// Returns `None` when `base` cannot carry path segments.
#[must_use]
pub fn download_url(base: &Url, identifier: &str, name: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(identifier)
        .extend(name.split('/').filter(|s| !s.is_empty()));
    Some(url)
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    files: Option<FileListing>,
}

/// Client for the metadata API and the download-page fallback.
#[derive(Debug, Clone)]
pub struct FileResolver {
    http: Client,
    metadata_base: Url,
    download_base: Url,
    extensions: Vec<String>,
    html_fallback: bool,
    retry: RetryPolicy,
}

impl FileResolver {
    /// Creates a resolver for `.pdf` files with the fallback enabled.
    #[must_use]
    pub fn new(http: Client, metadata_base: Url, download_base: Url) -> Self {
        Self {
            http,
            metadata_base,
            download_base,
            extensions: vec![".pdf".to_string()],
            html_fallback: true,
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a resolver from the harvest configuration.
    ///
    /// # Errors
    ///
    /// Returns the parse error of an invalid `metadata_url` or `download_url`.
    pub fn from_config(http: Client, config: &HarvestConfig) -> Result<Self, url::ParseError> {
        Ok(Self::new(
            http,
            Url::parse(&config.metadata_url)?,
            Url::parse(&config.download_url)?,
        )
        .with_extensions(config.pdf_extensions.clone())
        .with_html_fallback(config.html_fallback)
        .with_retry_policy(config.retry_policy()))
    }

    /// Overrides the accepted extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Enables or disables the download-page fallback.
    #[must_use]
    pub fn with_html_fallback(mut self, enabled: bool) -> Self {
        self.html_fallback = enabled;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Lists the item's files matching the configured extensions.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] for unknown items, failed requests, or bodies
    /// that cannot be parsed. A failing fallback request is not an error.
    #[instrument(skip(self))]
    pub async fn list_pdf_files(&self, identifier: &str) -> Result<Vec<FileCandidate>, MetadataError> {
        let listed = self
            .retry
            .run("metadata", || self.fetch_listing(identifier))
            .await?;
        let total = listed.len();

        let candidates: Vec<FileCandidate> = listed
            .into_iter()
            .filter(|file| has_extension(&file.name, &self.extensions))
            .filter_map(|file| self.candidate(identifier, file.name, file.size))
            .collect();
        debug!(listed = total, matched = candidates.len(), "metadata listing");

        if candidates.is_empty() && self.html_fallback {
            let fallback = self.scrape_download_page(identifier).await;
            if !fallback.is_empty() {
                info!(found = fallback.len(), "PDFs found on download page");
            }
            return Ok(fallback);
        }
        Ok(candidates)
    }

    fn candidate(&self, identifier: &str, name: String, size: Option<u64>) -> Option<FileCandidate> {
        let Some(url) = download_url(&self.download_base, identifier, &name) else {
            warn!(file = %name, "cannot build download URL");
            return None;
        };
        Some(FileCandidate {
            identifier: identifier.to_string(),
            format: FileFormat::from_name(&name),
            name,
            size,
            url,
        })
    }

    fn metadata_url(&self, identifier: &str) -> Option<Url> {
        let mut url = self.metadata_base.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push(identifier);
        Some(url)
    }

    async fn fetch_listing(&self, identifier: &str) -> Result<Vec<ListedFile>, MetadataError> {
        let url = self
            .metadata_url(identifier)
            .ok_or_else(|| MetadataError::unparseable(identifier, "metadata URL cannot hold a path"))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MetadataError::network(identifier, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::http_status(identifier, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MetadataError::network(identifier, e))?;
        parse_listing(identifier, &body)
    }

    async fn scrape_download_page(&self, identifier: &str) -> Vec<FileCandidate> {
        let Some(mut page_url) = download_url(&self.download_base, identifier, "") else {
            return Vec::new();
        };
        // Trailing slash so relative links resolve inside the item directory.
        page_url.set_path(&format!("{}/", page_url.path().trim_end_matches('/')));

        let html = match self.fetch_page(&page_url).await {
            Ok(html) => html,
            Err(error) => {
                debug!(error = %error, "download page fallback failed");
                return Vec::new();
            }
        };

        extract_links(&html, &page_url, &self.extensions)
            .into_iter()
            .map(|link| FileCandidate {
                identifier: identifier.to_string(),
                format: FileFormat::from_name(&link.name),
                name: link.name,
                size: None,
                url: link.url,
            })
            .collect()
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, reqwest::Error> {
        self.http
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

fn parse_listing(identifier: &str, body: &[u8]) -> Result<Vec<ListedFile>, MetadataError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| MetadataError::unparseable(identifier, e.to_string()))?;
    if value.as_object().is_some_and(serde_json::Map::is_empty) {
        return Err(MetadataError::unknown(identifier));
    }
    let response: MetadataResponse = serde_json::from_value(value)
        .map_err(|e| MetadataError::unparseable(identifier, e.to_string()))?;
    Ok(response
        .files
        .map(FileListing::into_files)
        .unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer) -> FileResolver {
        FileResolver::new(
            Client::new(),
            Url::parse(&format!("{}/metadata", server.uri())).unwrap(),
            Url::parse(&format!("{}/download", server.uri())).unwrap(),
        )
        .with_retry_policy(RetryPolicy::with_max_attempts(2).with_base_delay(Duration::ZERO))
    }

    async fn mount_metadata(server: &MockServer, identifier: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/metadata/{identifier}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_file_format_from_name() {
        assert_eq!(FileFormat::from_name("a/b.PDF"), FileFormat::Pdf);
        assert_eq!(
            FileFormat::from_name("b_djvu.txt"),
            FileFormat::Other("txt".into())
        );
        assert_eq!(FileFormat::from_name("README"), FileFormat::Other(String::new()));
        assert_eq!(
            FileFormat::from_name("v1.0/notes"),
            FileFormat::Other(String::new())
        );
    }

    #[test]
    fn test_download_url_encodes_each_segment() {
        let base = Url::parse("https://archive.org/download").unwrap();
        let url = download_url(&base, "item 1", "sub dir/كتاب #1.pdf").unwrap();
        assert!(url.as_str().starts_with("https://archive.org/download/item%201/sub%20dir/"));
        assert!(url.as_str().ends_with("%231.pdf"));
        assert_eq!(url.path_segments().unwrap().count(), 4);
    }

    #[test]
    fn test_download_url_tolerates_trailing_slash_base() {
        let base = Url::parse("https://archive.org/download/").unwrap();
        let url = download_url(&base, "item", "a.pdf").unwrap();
        assert_eq!(url.as_str(), "https://archive.org/download/item/a.pdf");
    }

    #[test]
    fn test_parse_listing_empty_object_is_unknown() {
        let error = parse_listing("ghost", b"{}").unwrap_err();
        assert!(matches!(error, MetadataError::UnknownIdentifier { .. }));
    }

    #[test]
    fn test_parse_listing_without_files_is_empty() {
        let files = parse_listing("item", br#"{"metadata": {"title": "x"}}"#).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_parse_listing_wrong_files_type_is_unparseable() {
        let error = parse_listing("item", br#"{"files": "nope"}"#).unwrap_err();
        assert!(matches!(error, MetadataError::Unparseable { .. }));
        let error = parse_listing("item", b"<html>").unwrap_err();
        assert!(matches!(error, MetadataError::Unparseable { .. }));
    }

    #[test]
    fn test_parse_listing_tolerates_one_bad_entry() {
        let files = parse_listing(
            "item",
            br#"{"files": [42, {"name": "book.pdf", "size": "3"}, {"format": "JPEG"}]}"#,
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "book.pdf");
        assert_eq!(files[0].size, Some(3));
    }

    #[tokio::test]
    async fn test_list_pdf_files_from_array_listing() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_metadata(
            &server,
            "item1",
            serde_json::json!({"files": [
                {"name": "book.pdf", "size": "100"},
                {"name": "book.epub"},
                {"name": "scans/VOL2.PDF"}
            ]}),
        )
        .await;

        let files = resolver(&server).list_pdf_files("item1").await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["book.pdf", "scans/VOL2.PDF"]);
        assert_eq!(files[0].size, Some(100));
        assert_eq!(files[0].format, FileFormat::Pdf);
        assert_eq!(
            files[1].url.as_str(),
            format!("{}/download/item1/scans/VOL2.PDF", server.uri())
        );
    }

    #[tokio::test]
    async fn test_mapping_and_array_listings_yield_same_candidates() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_metadata(
            &server,
            "mapped",
            serde_json::json!({"files": {"/a.pdf": {"size": "1"}, "/b.txt": {}}}),
        )
        .await;
        mount_metadata(
            &server,
            "listed",
            serde_json::json!({"files": [{"name": "a.pdf", "size": 1}, {"name": "b.txt"}]}),
        )
        .await;

        let resolver = resolver(&server);
        let mapped = resolver.list_pdf_files("mapped").await.unwrap();
        let listed = resolver.list_pdf_files("listed").await.unwrap();

        let strip = |files: Vec<FileCandidate>| -> Vec<(String, Option<u64>)> {
            files.into_iter().map(|f| (f.name, f.size)).collect()
        };
        assert_eq!(strip(mapped), strip(listed));
    }

    #[tokio::test]
    async fn test_unknown_identifier_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_metadata(&server, "ghost", serde_json::json!({})).await;

        let error = resolver(&server).list_pdf_files("ghost").await.unwrap_err();
        assert!(matches!(error, MetadataError::UnknownIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_html_fallback_when_listing_has_no_pdf() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_metadata(
            &server,
            "item2",
            serde_json::json!({"files": [{"name": "scan.djvu"}]}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/download/item2/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<a href="hidden.pdf">hidden.pdf</a>"#),
            )
            .mount(&server)
            .await;

        let files = resolver(&server).list_pdf_files("item2").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "hidden.pdf");
        assert_eq!(
            files[0].url.as_str(),
            format!("{}/download/item2/hidden.pdf", server.uri())
        );
    }

    #[tokio::test]
    async fn test_html_fallback_disabled_or_failing_yields_nothing() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_metadata(&server, "item3", serde_json::json!({"files": []})).await;
        Mock::given(method("GET"))
            .and(path("/download/item3/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let resolver = resolver(&server);
        assert!(resolver.list_pdf_files("item3").await.unwrap().is_empty());
        assert!(
            resolver
                .with_html_fallback(false)
                .list_pdf_files("item3")
                .await
                .unwrap()
                .is_empty()
        );
    }
}
