//! Shared test helpers for unit tests.

use std::sync::Arc;

use crate::blob_store::LocalBlobStore;
use crate::config::{Config, NodeConfig, StorageConfig};
use crate::coordinator::Coordinator;
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and local blob store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            root: files_dir.to_string_lossy().to_string(),
            ..StorageConfig::default()
        },
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let blobs = LocalBlobStore::new(&files_dir).expect("Failed to create test blob store");

    let coordinator = Coordinator::new(
        Arc::new(blobs),
        Arc::new(db),
        config.storage.public_url.clone(),
        config.storage.max_concurrent_writes,
    )
    .expect("Failed to create coordinator");

    Arc::new(AppState {
        config,
        coordinator,
    })
}
