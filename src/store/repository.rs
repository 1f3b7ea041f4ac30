//! Repository seam between the pipeline and record persistence.
//!
//! The pipeline only needs the dedup check and the append; depending on this
//! trait instead of [`RecordStore`] lets tests substitute failing stores.

use async_trait::async_trait;

use super::{NewDownloadRecord, RecordStore, Result};

/// Data-access contract used by the pipeline.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Returns whether `(identifier, file_name)` has already been recorded.
    async fn exists(&self, identifier: &str, file_name: &str) -> Result<bool>;

    /// Appends a download record and returns its id.
    async fn insert(&self, record: &NewDownloadRecord<'_>) -> Result<i64>;
}

#[async_trait]
impl RecordRepository for RecordStore {
    async fn exists(&self, identifier: &str, file_name: &str) -> Result<bool> {
        RecordStore::exists(self, identifier, file_name).await
    }

    async fn insert(&self, record: &NewDownloadRecord<'_>) -> Result<i64> {
        RecordStore::insert(self, record).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn record_once(repo: &dyn RecordRepository, identifier: &str, file: &str) -> bool {
        if repo.exists(identifier, file).await.unwrap() {
            return false;
        }
        repo.insert(&NewDownloadRecord {
            title: "t",
            identifier,
            file_name: file,
            download_url: "u",
            local_path: "p",
        })
        .await
        .unwrap();
        true
    }

    #[tokio::test]
    async fn test_repository_trait_delegates_to_store() {
        let store = RecordStore::open_in_memory().await.unwrap();

        assert!(record_once(&store, "item", "a.pdf").await);
        assert!(!record_once(&store, "item", "a.pdf").await);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
