use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};

use super::{BlobStore, BlobStoreError};

/// Blob store on the local filesystem.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, std::io::Error> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative blob path under the root, rejecting anything that
    /// could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, BlobStoreError> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() || trimmed.starts_with('/') || trimmed.contains('\\') {
            return Err(BlobStoreError::InvalidPath(path.to_string()));
        }

        for component in Path::new(trimmed).components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(BlobStoreError::InvalidPath(path.to_string()));
            }
        }

        Ok(self.root.join(trimmed))
    }
}

fn not_found_or_io(err: std::io::Error, path: &str) -> BlobStoreError {
    if err.kind() == ErrorKind::NotFound {
        BlobStoreError::NotFound(path.to_string())
    } else {
        BlobStoreError::Io(err)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_dir(&self, dir: &str) -> Result<(), BlobStoreError> {
        let full = self.resolve(dir)?;
        tokio::fs::create_dir_all(&full).await?;
        Ok(())
    }

    async fn write(
        &self,
        path: &str,
        body: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobStoreError> {
        let full = self.resolve(path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => BlobStoreError::AlreadyExists(path.to_string()),
                _ => BlobStoreError::Io(e),
            })?;

        let written = tokio::io::copy(body, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    async fn read(&self, path: &str) -> Result<Bytes, BlobStoreError> {
        let full = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| not_found_or_io(e, path))?;
        if !metadata.is_file() {
            return Err(BlobStoreError::NotFound(path.to_string()));
        }
        let data = tokio::fs::read(&full)
            .await
            .map_err(|e| not_found_or_io(e, path))?;
        Ok(Bytes::from(data))
    }

    async fn remove(&self, path: &str) -> Result<(), BlobStoreError> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| not_found_or_io(e, path))
    }

    async fn remove_dir(&self, dir: &str) -> Result<(), BlobStoreError> {
        let full = self.resolve(dir)?;
        tokio::fs::remove_dir(&full)
            .await
            .map_err(|e| not_found_or_io(e, dir))
    }
}
