//! Harvest configuration.
//!
//! A single [`HarvestConfig`] value is built once (defaults, then an optional
//! TOML file, then CLI overrides) and passed by reference to every component.
//!
//! ```toml
//! query = "Islamic books"
//! languages = ["Arabic", "English", "ar", "en"]
//! rows_per_page = 100
//! download_dir = "downloads"
//! api_delay_ms = 1000
//! item_delay_ms = 2000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Default search query.
pub const DEFAULT_QUERY: &str = "Islamic books";

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "harvester.toml";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The config path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unknown keys / wrong types.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The config path.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its accepted range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Everything the pipeline, the report and the CLI need to know.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    /// Search query sent as `q`.
    pub query: String,
    /// Accepted language values (matched trimmed and case-insensitively).
    pub languages: Vec<String>,
    /// Search page size (`rows`).
    pub rows_per_page: u32,
    /// Hard ceiling on search pages per run.
    pub max_pages: u32,
    /// Consecutive failed search pages after which searching stops.
    pub max_consecutive_page_errors: u32,
    /// Search sort order (`sort[]`).
    pub sort: String,
    /// Directory receiving downloaded PDFs.
    pub download_dir: PathBuf,
    /// SQLite record store path.
    pub database_path: PathBuf,
    /// Advanced search endpoint.
    pub search_url: String,
    /// Metadata endpoint base (`{metadata_url}/{identifier}`).
    pub metadata_url: String,
    /// Download endpoint base (`{download_url}/{identifier}/{file}`).
    pub download_url: String,
    /// Delay before every search request after the first.
    pub api_delay_ms: u64,
    /// Delay between processed items.
    pub item_delay_ms: u64,
    /// HTTP connect timeout.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout.
    pub read_timeout_secs: u64,
    /// Write buffer size used while streaming downloads.
    pub chunk_size: usize,
    /// Bytes between two progress log lines.
    pub progress_interval_bytes: u64,
    /// File extensions treated as wanted documents.
    pub pdf_extensions: Vec<String>,
    /// Scrape the item's download page when the metadata lists no PDF.
    pub html_fallback: bool,
    /// Attempts per request, including the first (1 disables retries).
    pub max_retries: u32,
    /// Base delay of the retry backoff.
    pub retry_base_delay_ms: u64,
    /// Plain-text log file written next to console output.
    pub log_file: PathBuf,
    /// Default log filter when neither `RUST_LOG` nor `-v`/`-q` are given.
    pub log_level: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            languages: ["Arabic", "English", "ar", "en", "ara", "eng"]
                .map(String::from)
                .to_vec(),
            rows_per_page: 100,
            max_pages: 100,
            max_consecutive_page_errors: 3,
            sort: "downloads desc".to_string(),
            download_dir: PathBuf::from("downloads"),
            database_path: PathBuf::from("books.db"),
            search_url: "https://archive.org/advancedsearch.php".to_string(),
            metadata_url: "https://archive.org/metadata".to_string(),
            download_url: "https://archive.org/download".to_string(),
            api_delay_ms: 1000,
            item_delay_ms: 2000,
            connect_timeout_secs: 30,
            read_timeout_secs: 60,
            chunk_size: 8192,
            progress_interval_bytes: 1024 * 1024,
            pdf_extensions: vec![".pdf".to_string()],
            html_fallback: true,
            max_retries: crate::retry::DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: 1000,
            log_file: PathBuf::from("scraper.log"),
            log_level: "info".to_string(),
        }
    }
}

impl HarvestConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Loads `path` if given, else `harvester.toml` when present, else defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an explicit path that cannot be loaded, or
    /// for an implicit file that is present but invalid.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    Self::load(implicit)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Checks ranges and non-empty lists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.trim().is_empty() {
            return Err(ConfigError::invalid("query", "must not be empty"));
        }
        if self.languages.iter().all(|l| l.trim().is_empty()) {
            return Err(ConfigError::invalid("languages", "needs at least one language"));
        }
        if !(1..=10_000).contains(&self.rows_per_page) {
            return Err(ConfigError::invalid(
                "rows_per_page",
                format!("{} (expected 1..=10000)", self.rows_per_page),
            ));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::invalid("max_pages", "must be at least 1"));
        }
        if self.max_consecutive_page_errors == 0 {
            return Err(ConfigError::invalid(
                "max_consecutive_page_errors",
                "must be at least 1",
            ));
        }
        validate_timeout("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout("read_timeout_secs", self.read_timeout_secs)?;
        if self.chunk_size < 512 {
            return Err(ConfigError::invalid(
                "chunk_size",
                format!("{} (expected at least 512)", self.chunk_size),
            ));
        }
        if self.progress_interval_bytes == 0 {
            return Err(ConfigError::invalid(
                "progress_interval_bytes",
                "must be at least 1",
            ));
        }
        if self
            .pdf_extensions
            .iter()
            .all(|ext| ext.trim_start_matches('.').trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "pdf_extensions",
                "needs at least one extension",
            ));
        }
        if !(1..=10).contains(&self.max_retries) {
            return Err(ConfigError::invalid(
                "max_retries",
                format!("{} (expected 1..=10)", self.max_retries),
            ));
        }
        for (field, value) in [
            ("search_url", &self.search_url),
            ("metadata_url", &self.metadata_url),
            ("download_url", &self.download_url),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(ConfigError::invalid(field, format!("'{value}' is not a URL")));
            }
        }
        Ok(())
    }

    /// Delay applied before each search request after the first.
    #[must_use]
    pub fn api_delay(&self) -> Duration {
        Duration::from_millis(self.api_delay_ms)
    }

    /// Delay applied between two processed items.
    #[must_use]
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    /// Retry policy shared by search, metadata and download requests.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries)
            .with_base_delay(Duration::from_millis(self.retry_base_delay_ms))
    }
}

fn validate_timeout(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("{value} (expected 1..=3600)"),
        ));
    }
    Ok(())
}
