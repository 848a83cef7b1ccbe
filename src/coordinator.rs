//! Storage coordination: keeps blob bytes, item records and the key index
//! consistent across uploads and deletes.
//!
//! Upload order: directory -> blob -> item record -> index entry.
//! Delete order: record lookup -> blob -> directory -> item record -> index entry.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Datelike, Local, TimeZone};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use crate::blob_store::{BlobStore, BlobStoreError};
use crate::key_index::KeyIndex;
use crate::storage::models::{ItemRecord, KeyMapEntry};
use crate::storage::{MetadataError, MetadataStore};

/// Length of the random leaf directory token.
///
/// 62^16 possible tokens per day directory. Collisions are unlikely but not
/// impossible; a colliding upload with the same filename fails instead of
/// overwriting the existing blob.
pub const DIRECTORY_TOKEN_LEN: usize = 16;

pub const UPLOAD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything except RFC 3986 unreserved characters is encoded in URL path segments.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Server(String),
}

/// A finished upload: the stored record and its public URL.
#[derive(Debug, Clone)]
pub struct Upload {
    pub item: ItemRecord,
    pub url: String,
}

pub struct Coordinator {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    index: KeyIndex,
    public_url: String,
    write_permits: Semaphore,
    /// Serializes record commits with their index updates, and whole deletes.
    commit_lock: Mutex<()>,
}

impl Coordinator {
    /// Build a coordinator, rebuilding the key index from the metadata store.
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        public_url: impl Into<String>,
        max_concurrent_writes: usize,
    ) -> Result<Self, CoordinatorError> {
        let items = metadata.ordered_items().map_err(|e| {
            CoordinatorError::Server(format!("Failed to load item index: {e}"))
        })?;
        let index = KeyIndex::from_items(&items);
        debug!(items = index.len(), "Key index rebuilt");

        Ok(Self {
            blobs,
            metadata,
            index,
            public_url: public_url.into(),
            write_permits: Semaphore::new(max_concurrent_writes.max(1)),
            commit_lock: Mutex::new(()),
        })
    }

    pub fn index(&self) -> &KeyIndex {
        &self.index
    }

    /// Store `body` as `filename` and record it.
    ///
    /// `filename` must already have passed the file-type allow-list.
    pub async fn upload(
        &self,
        filename: &str,
        body: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Upload, CoordinatorError> {
        validate_filename(filename)?;

        let permit = self
            .write_permits
            .acquire()
            .await
            .map_err(|_| CoordinatorError::Server("Server error.".to_string()))?;

        let directory = storage_directory(&Local::now());
        let blob_path = format!("{directory}{filename}");
        // Armed until the item record is committed
        let mut pending = PendingBlob::new(Arc::clone(&self.blobs), &directory, &blob_path);

        if let Err(e) = self.blobs.ensure_dir(&directory).await {
            error!(directory = %directory, error = %e, "Failed to create storage directory");
            pending.disarm();
            discard_blob(self.blobs.as_ref(), &directory, &blob_path).await;
            return Err(CoordinatorError::Server("Server error.".to_string()));
        }

        let byte_size = match self.blobs.write(&blob_path, body).await {
            Ok(n) => n,
            Err(BlobStoreError::AlreadyExists(path)) => {
                // The directory and file belong to another upload.
                pending.disarm();
                error!(path = %path, "Storage directory token collision");
                return Err(CoordinatorError::Server("Server error.".to_string()));
            }
            Err(e) => {
                error!(path = %blob_path, error = %e, "Failed to write blob");
                pending.disarm();
                discard_blob(self.blobs.as_ref(), &directory, &blob_path).await;
                return Err(CoordinatorError::Io("Write file failed.".to_string()));
            }
        };
        drop(permit);

        let now = Local::now();
        let item = ItemRecord {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            directory,
            tag_time: now.timestamp_millis().to_string(),
            upload_time: now.format(UPLOAD_TIME_FORMAT).to_string(),
        };

        {
            let _commit = self.commit_lock.lock().await;
            if let Err(e) = self.metadata.put_item(&item) {
                error!(item_id = %item.id, error = %e, "Failed to save item record, rolling back blob");
                pending.disarm();
                discard_blob(self.blobs.as_ref(), &item.directory, &blob_path).await;
                return Err(CoordinatorError::Io("Save database failed.".to_string()));
            }
            self.index.append(&item.id, &item.tag_time);
            pending.disarm();
        }

        let url = public_url(&self.public_url, &item.directory, &item.filename);
        info!(item_id = %item.id, path = %blob_path, bytes = byte_size, "Upload finished");

        Ok(Upload { item, url })
    }

    /// Remove an item's blob, directory, record and index entry.
    pub async fn delete(&self, id: &str) -> Result<(), CoordinatorError> {
        let _commit = self.commit_lock.lock().await;

        let item = match self.metadata.get_item(id) {
            Ok(item) => item,
            Err(MetadataError::NotFound(_)) => {
                debug!(item_id = %id, "Delete of unknown item");
                return Err(CoordinatorError::NotFound("Not found value by key.".to_string()));
            }
            Err(e) => {
                error!(item_id = %id, error = %e, "Failed to read item record");
                return Err(CoordinatorError::Io("System exception.".to_string()));
            }
        };

        let blob_path = item.blob_path();
        match self.blobs.remove(&blob_path).await {
            Ok(()) => {}
            Err(BlobStoreError::NotFound(_)) => {
                warn!(item_id = %id, path = %blob_path, "Blob already absent");
            }
            Err(e) => {
                warn!(item_id = %id, path = %blob_path, error = %e, "Failed to remove blob");
            }
        }

        if let Err(e) = self.blobs.remove_dir(&item.directory).await {
            warn!(item_id = %id, directory = %item.directory, error = %e, "Failed to remove directory");
        }

        match self.metadata.delete_item(id) {
            Ok(()) => {}
            Err(MetadataError::NotFound(_)) => {
                warn!(item_id = %id, "Item record already removed");
            }
            Err(e) => {
                error!(item_id = %id, error = %e, "Failed to delete item record");
                return Err(CoordinatorError::Io(
                    "Delete value failed in database.".to_string(),
                ));
            }
        }

        self.index.remove_by_id(id);
        info!(item_id = %id, path = %blob_path, "Delete finished");
        Ok(())
    }

    pub fn item(&self, id: &str) -> Result<ItemRecord, CoordinatorError> {
        self.metadata.get_item(id).map_err(|e| match e {
            MetadataError::NotFound(_) => {
                CoordinatorError::NotFound("Not found value by key.".to_string())
            }
            e => {
                error!(item_id = %id, error = %e, "Failed to read item record");
                CoordinatorError::Io("System exception.".to_string())
            }
        })
    }

    /// One 1-based page of the key index.
    pub fn list(&self, page: i64) -> Vec<KeyMapEntry> {
        self.index.page(page)
    }

    /// Read blob bytes by their path under the blob root.
    pub async fn read_blob(&self, path: &str) -> Result<Bytes, CoordinatorError> {
        self.blobs.read(path).await.map_err(|e| match e {
            BlobStoreError::NotFound(_) | BlobStoreError::InvalidPath(_) => {
                CoordinatorError::NotFound("File not found.".to_string())
            }
            e => {
                error!(path = %path, error = %e, "Failed to read blob");
                CoordinatorError::Io("Read file failed.".to_string())
            }
        })
    }
}

/// Best-effort removal of a blob and its leaf directory.
async fn discard_blob(blobs: &dyn BlobStore, directory: &str, blob_path: &str) {
    match blobs.remove(blob_path).await {
        Ok(()) | Err(BlobStoreError::NotFound(_)) => {}
        Err(e) => warn!(path = %blob_path, error = %e, "Failed to discard blob"),
    }
    match blobs.remove_dir(directory).await {
        Ok(()) | Err(BlobStoreError::NotFound(_)) => {}
        Err(e) => warn!(directory = %directory, error = %e, "Failed to discard directory"),
    }
}

/// Blob written (or being written) for an upload whose record is not yet
/// committed. Dropping it while armed discards the blob in the background,
/// which covers uploads cancelled mid-flight by a client disconnect.
struct PendingBlob {
    blobs: Arc<dyn BlobStore>,
    directory: String,
    path: String,
    armed: bool,
}

impl PendingBlob {
    fn new(blobs: Arc<dyn BlobStore>, directory: &str, path: &str) -> Self {
        Self {
            blobs,
            directory: directory.to_string(),
            path: path.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingBlob {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(path = %self.path, "No runtime available to discard abandoned blob");
            return;
        };

        warn!(path = %self.path, "Upload abandoned before commit, discarding blob");
        let blobs = Arc::clone(&self.blobs);
        let directory = std::mem::take(&mut self.directory);
        let path = std::mem::take(&mut self.path);
        handle.spawn(async move {
            discard_blob(blobs.as_ref(), &directory, &path).await;
        });
    }
}

/// Reject names that would escape or collide with the storage layout.
pub fn validate_filename(filename: &str) -> Result<(), CoordinatorError> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0'])
    {
        return Err(CoordinatorError::Validation(
            "Invalid file name.".to_string(),
        ));
    }
    Ok(())
}

/// `year/month/day/<token>/` for `now`, month and day without padding.
pub fn storage_directory<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!(
        "{}/{}/{}/{}/",
        now.year(),
        now.month(),
        now.day(),
        random_token(DIRECTORY_TOKEN_LEN)
    )
}

pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Join base URL, directory and filename, collapsing repeated `/` in the path.
///
/// Directory and filename segments are percent-encoded so the URL path
/// decodes back to the blob path.
pub fn public_url(base: &str, directory: &str, filename: &str) -> String {
    let (scheme, rest) = match base.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, base),
    };

    let blob_path = format!("{directory}/{filename}");
    let encoded: Vec<String> = blob_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect();

    let joined = format!("{rest}/{}", encoded.join("/"));
    let mut path = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && path.ends_with('/') {
            continue;
        }
        path.push(c);
    }

    match scheme {
        Some(scheme) => format!("{scheme}://{path}"),
        None => path,
    }
}
