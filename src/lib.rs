//! blob-vault - Blob storage service over HTTP
//!
//! This crate provides blob upload, delete, fetch and paginated listing with:
//! - Blob bytes on the local filesystem under `year/month/day/<token>/`
//! - redb embedded database for item records (ACID, MVCC, crash-safe)
//! - An in-memory key index for pagination, rebuilt from redb at startup
//! - REST API with multipart upload support

pub mod api;
pub mod blob_store;
pub mod config;
pub mod coordinator;
pub mod key_index;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use config::Config;
use coordinator::Coordinator;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub coordinator: Coordinator,
}
