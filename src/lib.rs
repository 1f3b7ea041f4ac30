//! Archive Harvester Library
//!
//! Batch-downloads language-filtered PDFs from the Internet Archive: a
//! paginated search, a language filter, a metadata-based file resolver, a
//! streaming downloader and a SQLite record store used for duplicate
//! suppression, sequenced by a single orchestrator.
//!
//! # Architecture
//!
//! - [`config`] - Harvest configuration (TOML file + CLI overrides)
//! - [`search`] - Advanced search client and pager
//! - [`language`] - Language allow-list filter
//! - [`resolver`] - Metadata file listing and download-page fallback
//! - [`download`] - Streaming download executor
//! - [`store`] - Persistent download records
//! - [`pipeline`] - Orchestrator, state machine and run statistics
//! - [`report`] - Read-only progress report

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod http;
pub mod language;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod search;
pub mod store;
pub mod throttle;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, HarvestConfig};
pub use download::{DownloadError, DownloadOutcome, Downloader, LogProgress, ProgressSink};
pub use language::LanguageFilter;
pub use pipeline::{FailureStage, Harvester, PipelineError, PipelineState, RunStatistics};
pub use report::ProgressReport;
pub use resolver::{FileCandidate, FileFormat, FileResolver, MetadataError};
pub use retry::{FailureType, RetryDecision, RetryPolicy};
pub use search::{SearchClient, SearchError, SearchPage, SearchResultItem};
pub use store::{RecordRepository, RecordStore, StoreError};
