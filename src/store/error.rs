//! Error types for record store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing download records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A query failed or the connection pool is unusable.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store file could not be opened or its parent directory created.
    #[error("failed to open record store at {path}: {message}")]
    Initialize {
        /// Database file being opened.
        path: PathBuf,
        /// Human-readable cause.
        message: String,
    },

    /// Applying the embedded schema failed.
    #[error("failed to apply record store schema: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn initialize(path: &std::path::Path, cause: &dyn std::fmt::Display) -> Self {
        Self::Initialize {
            path: path.to_path_buf(),
            message: cause.to_string(),
        }
    }
}
