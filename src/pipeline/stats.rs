//! Run statistics.

use std::fmt;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// Fetching a search page.
    Search,
    /// Listing an item's files.
    Metadata,
    /// Streaming a file to disk.
    Download,
    /// Duplicate check or record insert.
    Store,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Search => "search",
            Self::Metadata => "metadata",
            Self::Download => "download",
            Self::Store => "store",
        };
        f.write_str(name)
    }
}

/// Failures per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureCounts {
    /// Search pages that failed.
    pub search: u64,
    /// Items whose file listing failed.
    pub metadata: u64,
    /// Files that failed to download.
    pub download: u64,
    /// Failed duplicate checks and inserts.
    pub store: u64,
}

impl FailureCounts {
    /// Sum over all stages.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.search + self.metadata + self.download + self.store
    }

    /// Count for one stage.
    #[must_use]
    pub fn get(&self, stage: FailureStage) -> u64 {
        match stage {
            FailureStage::Search => self.search,
            FailureStage::Metadata => self.metadata,
            FailureStage::Download => self.download,
            FailureStage::Store => self.store,
        }
    }

    fn slot(&mut self, stage: FailureStage) -> &mut u64 {
        match stage {
            FailureStage::Search => &mut self.search,
            FailureStage::Metadata => &mut self.metadata,
            FailureStage::Download => &mut self.download,
            FailureStage::Store => &mut self.store,
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Search pages that returned at least one document.
    pub pages_fetched: u64,
    /// Search documents seen.
    pub items_seen: u64,
    /// Items accepted by the language filter.
    pub items_accepted: u64,
    /// Accepted items whose files were looked up.
    pub books_processed: u64,
    /// PDF files listed across processed items.
    pub files_found: u64,
    /// Files downloaded this run.
    pub files_downloaded: u64,
    /// Files skipped because a record already existed.
    pub files_skipped: u64,
    /// Bytes written this run.
    pub bytes_downloaded: u64,
    /// Failures per stage.
    pub failures: FailureCounts,
}

impl RunStatistics {
    /// Counts one failure at `stage`.
    pub fn record_failure(&mut self, stage: FailureStage) {
        *self.failures.slot(stage) += 1;
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run summary")?;
        writeln!(f, "  Pages fetched:     {}", self.pages_fetched)?;
        writeln!(
            f,
            "  Items accepted:    {} of {}",
            self.items_accepted, self.items_seen
        )?;
        writeln!(f, "  Books processed:   {}", self.books_processed)?;
        writeln!(f, "  PDF files found:   {}", self.files_found)?;
        writeln!(f, "  Downloaded:        {}", self.files_downloaded)?;
        writeln!(f, "  Skipped (exists):  {}", self.files_skipped)?;
        writeln!(
            f,
            "  Bytes downloaded:  {}",
            format_bytes(self.bytes_downloaded)
        )?;
        write!(
            f,
            "  Failures:          {} (search {}, metadata {}, download {}, store {})",
            self.failures.total(),
            self.failures.search,
            self.failures.metadata,
            self.failures.download,
            self.failures.store
        )
    }
}

/// Formats a byte count with a binary unit (`1.5 MiB`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
