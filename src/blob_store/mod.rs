mod local;

pub use local::LocalBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blob already exists: {0}")]
    AlreadyExists(String),
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("Invalid blob path: {0}")]
    InvalidPath(String),
}

/// Byte storage for uploaded blobs.
///
/// Paths are relative to the store root and look like
/// `year/month/day/<token>/<filename>`; directories end with `/`.
/// The bytes mean nothing without the item record that points at them.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create `dir` and any missing parents. Succeeds if it already exists.
    async fn ensure_dir(&self, dir: &str) -> Result<(), BlobStoreError>;

    /// Stream `body` into a new file at `path` and return the bytes written.
    ///
    /// Fails with `AlreadyExists` if a file is already at `path`. A failed
    /// write may leave a partial file behind; callers own the cleanup.
    async fn write(
        &self,
        path: &str,
        body: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobStoreError>;

    async fn read(&self, path: &str) -> Result<Bytes, BlobStoreError>;

    async fn remove(&self, path: &str) -> Result<(), BlobStoreError>;

    /// Remove an empty directory. Fails if the directory still has entries.
    async fn remove_dir(&self, dir: &str) -> Result<(), BlobStoreError>;
}
