//! Streaming download executor.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::DEFAULT_CHUNK_SIZE;
use super::error::DownloadError;
use super::path::partial_path;
use super::progress::ProgressSink;
use crate::config::HarvestConfig;
use crate::retry::{RetryDecision, RetryPolicy, RetryableError};

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Where the file was written.
    pub path: PathBuf,
    /// Bytes written to disk.
    pub bytes_written: u64,
    /// Declared `Content-Length`, when the server sent one.
    pub content_length: Option<u64>,
}

/// Streams remote files to disk.
///
/// The body streams into a `.part` sibling that is renamed over the
/// destination only once complete, so a failed attempt never touches an
/// existing file at the destination.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use archive_harvester::download::{Downloader, LogProgress};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = Downloader::new(reqwest::Client::new());
/// let outcome = downloader
///     .download(
///         "https://archive.org/download/item/book.pdf",
///         Path::new("downloads/book.pdf"),
///         &mut LogProgress::default(),
///     )
///     .await?;
/// println!("{} bytes", outcome.bytes_written);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
    chunk_size: usize,
    retry: RetryPolicy,
}

impl Downloader {
    /// Creates a downloader with the default buffer size and retry policy.
    #[must_use]
    pub fn new(http: Client) -> Self {
        Self {
            http,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a downloader from the harvest configuration.
    #[must_use]
    pub fn from_config(http: Client, config: &HarvestConfig) -> Self {
        Self::new(http)
            .with_chunk_size(config.chunk_size)
            .with_retry_policy(config.retry_policy())
    }

    /// Overrides the write buffer capacity.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Streams `url` to `destination`, creating missing parent directories.
    ///
    /// Transient failures are retried from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] when the final attempt fails. The `.part`
    /// file is removed before returning.
    #[instrument(skip(self, destination, progress), fields(dest = %destination.display()))]
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let mut attempt = 1;
        loop {
            match self.download_once(&parsed, destination, progress).await {
                Ok(outcome) => return Ok(outcome),
                Err(error) => {
                    progress.abandon();
                    match self.retry.should_retry(error.failure_type(), attempt) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next,
                        } => {
                            warn!(
                                attempt,
                                delay_ms = delay.as_millis(),
                                error = %error,
                                "download failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            attempt = next;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(attempt, %reason, "giving up on download");
                            return Err(error);
                        }
                    }
                }
            }
        }
    }

    async fn download_once(
        &self,
        url: &Url,
        destination: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }
        let content_length = response.content_length();

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let partial = partial_path(destination);
        let file = File::create(&partial)
            .await
            .map_err(|e| DownloadError::io(&partial, e))?;

        let name = destination
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        progress.start(&name, content_length);

        let result = self
            .stream_to_file(file, response, url, &partial, progress)
            .await
            .and_then(|written| match content_length {
                Some(expected) if expected != written => {
                    Err(DownloadError::integrity(destination, expected, written))
                }
                _ => Ok(written),
            });
        let result = match result {
            Ok(written) => tokio::fs::rename(&partial, destination)
                .await
                .map(|()| written)
                .map_err(|e| DownloadError::io(destination, e)),
            Err(error) => Err(error),
        };

        match result {
            Ok(bytes_written) => {
                progress.finish(bytes_written);
                info!(bytes = bytes_written, "download complete");
                Ok(DownloadOutcome {
                    path: destination.to_path_buf(),
                    bytes_written,
                    content_length,
                })
            }
            Err(error) => {
                debug!(path = %partial.display(), "removing partial file");
                if let Err(e) = tokio::fs::remove_file(&partial).await {
                    warn!(path = %partial.display(), error = %e, "could not remove partial file");
                }
                Err(error)
            }
        }
    }

    /// Streams the body through a buffered writer, returning bytes written.
    async fn stream_to_file(
        &self,
        file: File,
        response: reqwest::Response,
        url: &Url,
        path: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<u64, DownloadError> {
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url.as_str(), e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(path, e))?;
            bytes_written += chunk.len() as u64;
            progress.advance(chunk.len() as u64);
        }

        writer.flush().await.map_err(|e| DownloadError::io(path, e))?;
        Ok(bytes_written)
    }
}
