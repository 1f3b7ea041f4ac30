//! Pipeline orchestration.
//!
//! [`Harvester`] sequences search, language filtering, file resolution,
//! download and recording. Every page, item and file is handled in order;
//! a failure at any of them is logged with its stage, counted in
//! [`RunStatistics`], and skipped. Only construction can fail.
//!
//! # Example
//!
//! ```no_run
//! use archive_harvester::{HarvestConfig, Harvester, LogProgress};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut harvester = Harvester::open(HarvestConfig::default()).await?;
//! let stats = harvester.run(&mut LogProgress::default()).await;
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```

mod state;
mod stats;

use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, trace, warn};

pub use state::PipelineState;
pub use stats::{FailureCounts, FailureStage, RunStatistics, format_bytes};

use crate::config::{ConfigError, HarvestConfig};
use crate::download::{Downloader, ProgressSink, local_path, unique_path};
use crate::http::{HttpTimeouts, build_http_client};
use crate::language::LanguageFilter;
use crate::resolver::{FileCandidate, FileResolver};
use crate::search::{PagerEvent, SearchClient, SearchPager, SearchResultItem};
use crate::store::{NewDownloadRecord, RecordRepository, RecordStore, StoreError};
use crate::throttle::Throttle;

/// Fatal errors: the harvester could not be set up.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The record store could not be opened or migrated.
    #[error("failed to initialize record store: {0}")]
    Store(#[from] StoreError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// An endpoint URL does not parse.
    #[error("invalid {name} endpoint: {source}")]
    Endpoint {
        /// Which endpoint (`search`, `metadata`, `download`).
        name: &'static str,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
}

/// Sequential search → filter → resolve → download → record pipeline.
#[derive(Debug)]
pub struct Harvester<R = RecordStore> {
    config: HarvestConfig,
    search: SearchClient,
    resolver: FileResolver,
    downloader: Downloader,
    filter: LanguageFilter,
    store: R,
    stats: RunStatistics,
    state: PipelineState,
}

impl Harvester<RecordStore> {
    /// Validates `config` and opens the record store at `database_path`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the config is invalid, the store cannot
    /// be initialized, or the HTTP client cannot be built.
    pub async fn open(config: HarvestConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let store = RecordStore::open(&config.database_path).await?;
        Self::with_store(config, store)
    }
}

impl<R: RecordRepository> Harvester<R> {
    /// Builds a harvester over an already initialized store.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when an endpoint is invalid or the HTTP
    /// client cannot be built.
    pub fn with_store(config: HarvestConfig, store: R) -> Result<Self, PipelineError> {
        let http = build_http_client(HttpTimeouts::from_config(&config))
            .map_err(PipelineError::HttpClient)?;
        let search = SearchClient::from_config(http.clone(), &config)
            .map_err(|source| PipelineError::Endpoint {
                name: "search",
                source,
            })?;
        let resolver = FileResolver::from_config(http.clone(), &config).map_err(|source| {
            PipelineError::Endpoint {
                name: "metadata/download",
                source,
            }
        })?;
        let downloader = Downloader::from_config(http, &config);
        let filter = LanguageFilter::new(&config.languages);

        Ok(Self {
            config,
            search,
            resolver,
            downloader,
            filter,
            store,
            stats: RunStatistics::default(),
            state: PipelineState::Idle,
        })
    }

    /// Counters of the current (or last) run.
    ///
    /// Kept up to date while running, so an interrupted run still reports
    /// what it did.
    #[must_use]
    pub fn statistics(&self) -> RunStatistics {
        self.stats
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// The record store.
    #[must_use]
    pub fn store(&self) -> &R {
        &self.store
    }

    /// Consumes the harvester, returning the record store.
    #[must_use]
    pub fn into_store(self) -> R {
        self.store
    }

    /// Runs the pipeline to completion and returns its statistics.
    pub async fn run(&mut self, progress: &mut dyn ProgressSink) -> RunStatistics {
        self.stats = RunStatistics::default();
        self.state = PipelineState::Idle;
        info!(
            query = %self.config.query,
            rows = self.config.rows_per_page,
            "harvest started"
        );

        let mut pager = SearchPager::new(self.search.clone(), &self.config);
        let mut item_throttle = Throttle::new(self.config.item_delay());

        loop {
            self.transition(PipelineState::Searching {
                page: pager.next_page_number(),
            });
            let Some(event) = pager.next().await else {
                break;
            };

            match event {
                PagerEvent::Failed { number, error } => {
                    warn!(page = number, stage = %FailureStage::Search, error = %error, "search page failed");
                    self.stats.record_failure(FailureStage::Search);
                }
                PagerEvent::Page { number, page } => {
                    let total = page.total;
                    let seen = page.items.len();
                    let accepted: Vec<SearchResultItem> = page
                        .items
                        .into_iter()
                        .filter(|item| self.filter.is_accepted_language(item))
                        .collect();

                    self.stats.pages_fetched += 1;
                    self.stats.items_seen += seen as u64;
                    self.stats.items_accepted += accepted.len() as u64;
                    info!(
                        page = number,
                        total,
                        items = seen,
                        accepted = accepted.len(),
                        "search page fetched"
                    );

                    for item in &accepted {
                        item_throttle.wait().await;
                        let span = info_span!("book", identifier = %item.identifier);
                        self.process_book(item, progress).instrument(span).await;
                    }
                }
            }
        }

        self.transition(PipelineState::Done);
        info!(
            pages = self.stats.pages_fetched,
            downloaded = self.stats.files_downloaded,
            skipped = self.stats.files_skipped,
            failures = self.stats.failures.total(),
            "harvest finished"
        );
        self.stats
    }

    async fn process_book(&mut self, item: &SearchResultItem, progress: &mut dyn ProgressSink) {
        self.stats.books_processed += 1;
        self.transition(PipelineState::ProcessingBook {
            identifier: item.identifier.clone(),
        });
        info!(title = %item.title, "processing book");

        let files = match self.resolver.list_pdf_files(&item.identifier).await {
            Ok(files) => files,
            Err(error) => {
                warn!(stage = %FailureStage::Metadata, error = %error, "file listing failed");
                self.stats.record_failure(FailureStage::Metadata);
                return;
            }
        };

        self.stats.files_found += files.len() as u64;
        if files.is_empty() {
            info!("no PDF files found");
            return;
        }

        for file in &files {
            self.process_file(item, file, progress).await;
        }
    }

    async fn process_file(
        &mut self,
        item: &SearchResultItem,
        file: &FileCandidate,
        progress: &mut dyn ProgressSink,
    ) {
        match self.store.exists(&file.identifier, &file.name).await {
            Ok(true) => {
                info!(file = %file.name, "already downloaded, skipping");
                self.stats.files_skipped += 1;
                return;
            }
            Ok(false) => {}
            Err(error) => {
                warn!(file = %file.name, stage = %FailureStage::Store, error = %error, "duplicate check failed, skipping file");
                self.stats.record_failure(FailureStage::Store);
                return;
            }
        }

        let Some(target) = local_path(&self.config.download_dir, &file.name) else {
            warn!(file = %file.name, stage = %FailureStage::Download, "file name maps to no local path");
            self.stats.record_failure(FailureStage::Download);
            return;
        };
        // No record owns this file yet, so anything already at `target` belongs
        // to another item.
        let destination = unique_path(&target);
        if destination != target {
            info!(file = %file.name, path = %destination.display(), "local name taken, saving under a new name");
        }

        self.transition(PipelineState::Downloading {
            identifier: file.identifier.clone(),
            file: file.name.clone(),
        });
        let outcome = match self
            .downloader
            .download(file.url.as_str(), &destination, progress)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(file = %file.name, stage = %FailureStage::Download, error = %error, "download failed");
                self.stats.record_failure(FailureStage::Download);
                return;
            }
        };
        self.stats.files_downloaded += 1;
        self.stats.bytes_downloaded += outcome.bytes_written;

        self.transition(PipelineState::Recording {
            identifier: file.identifier.clone(),
            file: file.name.clone(),
        });
        let local = outcome.path.to_string_lossy();
        let record = NewDownloadRecord {
            title: &item.title,
            identifier: &file.identifier,
            file_name: &file.name,
            download_url: file.url.as_str(),
            local_path: &local,
        };
        match self.store.insert(&record).await {
            Ok(id) => debug!(file = %file.name, id, "download recorded"),
            Err(error) => {
                warn!(file = %file.name, stage = %FailureStage::Store, error = %error, "failed to record download");
                self.stats.record_failure(FailureStage::Store);
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        if !self.state.can_transition_to(&next) {
            debug!(from = %self.state, to = %next, "unexpected state transition");
        }
        trace!(state = %next);
        self.state = next;
    }
}
