use redb::{Database as RedbDatabase, ReadTransaction, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

/// File name of the metadata store inside the data directory.
pub const DATABASE_FILE: &str = "blob-vault.redb";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for MetadataError {
    fn from(e: redb::CommitError) -> Self {
        MetadataError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for MetadataError {
    fn from(e: redb::DatabaseError) -> Self {
        MetadataError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for MetadataError {
    fn from(e: redb::Error) -> Self {
        MetadataError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for MetadataError {
    fn from(e: redb::StorageError) -> Self {
        MetadataError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for MetadataError {
    fn from(e: redb::TableError) -> Self {
        MetadataError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for MetadataError {
    fn from(e: redb::TransactionError) -> Self {
        MetadataError::Transaction(Box::new(e))
    }
}

/// Long-lived handle to the redb metadata store.
///
/// redb allows one write transaction at a time and serves readers from
/// MVCC snapshots, so writers are serialized against each other while
/// reads proceed in parallel.
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl Database {
    /// Open or create the metadata store inside `data_dir`
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, MetadataError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join(DATABASE_FILE);
        let db = Arc::new(RedbDatabase::create(db_path)?);

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ITEMS)?;
            let _ = write_txn.open_table(ITEM_ORDER)?;
            let _ = write_txn.open_table(ITEM_SEQUENCE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, MetadataError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, MetadataError> {
        Ok(self.db.begin_write()?)
    }
}
