//! Download record row types.

use sqlx::FromRow;

/// A persisted download row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DownloadRecord {
    /// Auto-increment row id.
    pub id: i64,
    /// Item title as reported by the search API.
    pub title: Option<String>,
    /// Archive identifier of the parent item.
    pub identifier: String,
    /// File name as listed by the archive.
    pub file_name: String,
    /// URL the file was fetched from.
    pub download_url: String,
    /// Where the file was written.
    pub local_path: String,
    /// Insert timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub created_at: String,
}

/// Values for a row about to be inserted.
///
/// `id` and `created_at` are assigned by the database.
#[derive(Debug, Clone, Copy)]
pub struct NewDownloadRecord<'a> {
    pub title: &'a str,
    pub identifier: &'a str,
    pub file_name: &'a str,
    pub download_url: &'a str,
    pub local_path: &'a str,
}
