use crate::error::{ArchiveError, SearchError};
use crate::models::{IndexEntry, IngestRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// Durable blob storage for original uploads, keyed by `organization/file_name`.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, ArchiveError>;

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, ArchiveError>;

    /// Fails with [`ArchiveError::NotFound`] when nothing is stored at `path`.
    async fn delete(&self, path: &str) -> Result<(), ArchiveError>;

    /// All stored paths, sorted, optionally restricted to those starting with `prefix`.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, ArchiveError>;
}

/// Searchable store of ingest records.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Writes one batch as a single request.
    async fn upload_batch(&self, records: &[IngestRecord]) -> Result<(), SearchError>;

    /// Deletes every listed id in one request; unknown ids are ignored.
    async fn delete_by_ids(&self, ids: &[String]) -> Result<(), SearchError>;

    /// Every indexed entry. Used to build deletion candidate sets client-side.
    async fn scan_all(&self) -> Result<Vec<IndexEntry>, SearchError>;
}

#[async_trait]
impl<T: ArchiveStore + ?Sized> ArchiveStore for Arc<T> {
    async fn exists(&self, path: &str) -> Result<bool, ArchiveError> {
        (**self).exists(path).await
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        (**self).write(path, bytes).await
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        (**self).read(path).await
    }

    async fn delete(&self, path: &str) -> Result<(), ArchiveError> {
        (**self).delete(path).await
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, ArchiveError> {
        (**self).list(prefix).await
    }
}

#[async_trait]
impl<T: SearchIndex + ?Sized> SearchIndex for Arc<T> {
    async fn upload_batch(&self, records: &[IngestRecord]) -> Result<(), SearchError> {
        (**self).upload_batch(records).await
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<(), SearchError> {
        (**self).delete_by_ids(ids).await
    }

    async fn scan_all(&self) -> Result<Vec<IndexEntry>, SearchError> {
        (**self).scan_all().await
    }
}
