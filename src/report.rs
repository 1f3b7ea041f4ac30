//! Read-only progress report over the record store, download directory and log.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use crate::config::HarvestConfig;
use crate::pipeline::format_bytes;
use crate::store::{DownloadRecord, RecordStore, StoreError};

/// Records shown in the "recent downloads" section.
const RECENT_LIMIT: u32 = 5;

/// Log lines shown at the end of the report.
const LOG_TAIL_LINES: usize = 3;

/// Bytes read from the end of the log to find its last lines.
const LOG_TAIL_BYTES: u64 = 64 * 1024;

/// Record store section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    /// Rows in `downloads`.
    pub total_downloads: i64,
    /// Distinct identifiers.
    pub unique_identifiers: i64,
    /// Total size of recorded files that still exist.
    pub recorded_bytes: u64,
    /// Most recent records, newest first.
    pub recent: Vec<DownloadRecord>,
}

/// Download directory section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectorySummary {
    /// PDF files found (recursively).
    pub pdf_files: u64,
    /// Their total size.
    pub pdf_bytes: u64,
}

/// Log file section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSummary {
    /// Log file size.
    pub size: u64,
    /// Last non-empty lines, oldest first.
    pub last_lines: Vec<String>,
}

/// Snapshot printed by the `progress` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    /// Database path the report was taken from.
    pub database_path: PathBuf,
    /// `None` when the database does not exist yet.
    pub store: Option<StoreSummary>,
    /// Download directory path.
    pub download_dir: PathBuf,
    /// `None` when the directory does not exist yet.
    pub directory: Option<DirectorySummary>,
    /// Log file path.
    pub log_file: PathBuf,
    /// `None` when there is no log file.
    pub log: Option<LogSummary>,
}

impl ProgressReport {
    /// Gathers the report without creating any missing file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when an existing database cannot be read.
    pub async fn gather(config: &HarvestConfig) -> Result<Self, StoreError> {
        let store = if config.database_path.is_file() {
            Some(summarize_store(&config.database_path).await?)
        } else {
            None
        };
        let directory = if config.download_dir.is_dir() {
            Some(summarize_directory(&config.download_dir).await)
        } else {
            None
        };
        let log = summarize_log(&config.log_file).await;

        Ok(Self {
            database_path: config.database_path.clone(),
            store,
            download_dir: config.download_dir.clone(),
            directory,
            log_file: config.log_file.clone(),
            log,
        })
    }
}

async fn summarize_store(path: &Path) -> Result<StoreSummary, StoreError> {
    let store = RecordStore::open_read_only(path).await?;
    let total_downloads = store.count().await?;
    let unique_identifiers = store.count_identifiers().await?;
    let recent = store.recent(RECENT_LIMIT).await?;

    let mut recorded_bytes = 0;
    for local in store.local_paths().await? {
        if let Ok(meta) = tokio::fs::metadata(&local).await
            && meta.is_file()
        {
            recorded_bytes += meta.len();
        }
    }
    store.close().await;

    Ok(StoreSummary {
        total_downloads,
        unique_identifiers,
        recorded_bytes,
        recent,
    })
}

async fn summarize_directory(root: &Path) -> DirectorySummary {
    let mut summary = DirectorySummary::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) => {
                debug!(dir = %dir.display(), error = %error, "cannot read directory");
                continue;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
            {
                summary.pdf_files += 1;
                if let Ok(meta) = entry.metadata().await {
                    summary.pdf_bytes += meta.len();
                }
            }
        }
    }
    summary
}

async fn summarize_log(path: &Path) -> Option<LogSummary> {
    let mut file = tokio::fs::File::open(path).await.ok()?;
    let size = file.metadata().await.ok()?.len();

    let start = size.saturating_sub(LOG_TAIL_BYTES);
    file.seek(SeekFrom::Start(start)).await.ok()?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail).await.ok()?;

    Some(LogSummary {
        size,
        last_lines: last_lines(&String::from_utf8_lossy(&tail), LOG_TAIL_LINES),
    })
}

fn last_lines(text: &str, count: usize) -> Vec<String> {
    let mut lines: Vec<String> = text
        .lines()
        .rev()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .take(count)
        .map(String::from)
        .collect();
    lines.reverse();
    lines
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database: {}", self.database_path.display())?;
        match &self.store {
            None => writeln!(f, "  no database yet")?,
            Some(store) => {
                writeln!(f, "  Total downloads:    {}", store.total_downloads)?;
                writeln!(f, "  Unique identifiers: {}", store.unique_identifiers)?;
                writeln!(
                    f,
                    "  Recorded size:      {}",
                    format_bytes(store.recorded_bytes)
                )?;
                if !store.recent.is_empty() {
                    writeln!(f, "  Recent downloads:")?;
                    for record in &store.recent {
                        writeln!(
                            f,
                            "    {}  {} / {}  ({})",
                            record.created_at,
                            record.identifier,
                            record.file_name,
                            record.title.as_deref().unwrap_or("untitled")
                        )?;
                    }
                }
            }
        }

        writeln!(f, "Download directory: {}", self.download_dir.display())?;
        match &self.directory {
            None => writeln!(f, "  does not exist yet")?,
            Some(dir) => writeln!(
                f,
                "  PDF files: {} ({})",
                dir.pdf_files,
                format_bytes(dir.pdf_bytes)
            )?,
        }

        write!(f, "Log file: {}", self.log_file.display())?;
        match &self.log {
            None => write!(f, "\n  not found"),
            Some(log) => {
                write!(f, "\n  Size: {}", format_bytes(log.size))?;
                for line in &log.last_lines {
                    write!(f, "\n  | {line}")?;
                }
                Ok(())
            }
        }
    }
}
