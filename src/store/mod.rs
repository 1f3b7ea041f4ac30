//! Persistent record of downloaded files, used for duplicate suppression.
//!
//! Each successful download appends one row to the `downloads` table. Rows are
//! never updated or deleted by the harvester; the `(identifier, file_name)`
//! pair is kept unique by checking [`RecordStore::exists`] before every
//! download.
//!
//! # Example
//!
//! ```no_run
//! use archive_harvester::store::{NewDownloadRecord, RecordStore};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RecordStore::open(Path::new("books.db")).await?;
//! if !store.exists("some-item", "book.pdf").await? {
//!     // ... download ...
//!     store
//!         .insert(&NewDownloadRecord {
//!             title: "Some book",
//!             identifier: "some-item",
//!             file_name: "book.pdf",
//!             download_url: "https://archive.org/download/some-item/book.pdf",
//!             local_path: "downloads/book.pdf",
//!         })
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod record;
mod repository;

pub use error::StoreError;
pub use record::{DownloadRecord, NewDownloadRecord};
pub use repository::RecordRepository;

use std::path::Path;
use std::time::Duration;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, instrument};

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The harvester is sequential; a small pool is plenty.
const MAX_CONNECTIONS: u32 = 2;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed download record store.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// Opens the store at `path`, creating the file and schema if needed.
    ///
    /// File databases run in WAL mode. Migrations are tracked, so reopening an
    /// initialized store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Initialize`] when the file cannot be opened and
    /// [`StoreError::Migration`] when the schema cannot be applied.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::initialize(path, &e))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::initialize(path, &e))?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("record store initialized");
        Ok(Self { pool })
    }

    /// Opens an existing store for reading only.
    ///
    /// Nothing is created or migrated and the journal mode is left alone, so
    /// databases written by other tools can be inspected as they are.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Initialize`] when the file is missing or is not a
    /// readable `SQLite` database.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open_read_only(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::initialize(path, &e))?;
        Ok(Self { pool })
    }

    /// Opens a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] when the schema cannot be applied.
    pub async fn open_in_memory() -> Result<Self> {
        let options: SqliteConnectOptions = "sqlite::memory:".parse()?;
        // Every new connection to `:memory:` is a fresh database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns whether a record exists for this identifier and file name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn exists(&self, identifier: &str, file_name: &str) -> Result<bool> {
        let row = sqlx::query(
            r"SELECT EXISTS(
                  SELECT 1 FROM downloads WHERE identifier = ? AND file_name = ?
              ) AS present",
        )
        .bind(identifier)
        .bind(file_name)
        .fetch_one(&self.pool)
        .await?;

        let present: i64 = row.try_get("present")?;
        Ok(present != 0)
    }

    /// Appends a record and returns its row id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self, record), fields(identifier = record.identifier, file = record.file_name))]
    pub async fn insert(&self, record: &NewDownloadRecord<'_>) -> Result<i64> {
        let row = sqlx::query(
            r"INSERT INTO downloads (title, identifier, file_name, download_url, local_path)
              VALUES (?, ?, ?, ?, ?)
              RETURNING id",
        )
        .bind(record.title)
        .bind(record.identifier)
        .bind(record.file_name)
        .bind(record.download_url)
        .bind(record.local_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    /// Total number of recorded downloads.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM downloads")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of distinct identifiers with at least one recorded file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn count_identifiers(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT identifier) FROM downloads")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Most recent records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<DownloadRecord>> {
        let records = sqlx::query_as::<_, DownloadRecord>(
            r"SELECT id, title, identifier, file_name, download_url, local_path, created_at
              FROM downloads
              ORDER BY created_at DESC, id DESC
              LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Local paths of every recorded download.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn local_paths(&self) -> Result<Vec<String>> {
        let paths: Vec<(String,)> = sqlx::query_as("SELECT local_path FROM downloads ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(paths.into_iter().map(|(path,)| path).collect())
    }

    /// Closes the underlying pool.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
