use redb::ReadableTable;

use super::db::{Database, MetadataError};
use super::models::ItemRecord;
use super::tables::*;

/// Persistent identifier -> item record mapping.
pub trait MetadataStore: Send + Sync {
    /// Store `item` under its identifier. First insertion of an identifier
    /// also assigns its place in the insertion order.
    fn put_item(&self, item: &ItemRecord) -> Result<(), MetadataError>;

    /// Fails with `NotFound` when no record exists for `id`.
    fn get_item(&self, id: &str) -> Result<ItemRecord, MetadataError>;

    /// Fails with `NotFound` when no record exists for `id`.
    fn delete_item(&self, id: &str) -> Result<(), MetadataError>;

    /// All records in insertion order.
    fn ordered_items(&self) -> Result<Vec<ItemRecord>, MetadataError>;
}

impl MetadataStore for Database {
    fn put_item(&self, item: &ItemRecord) -> Result<(), MetadataError> {
        debug_assert!(!item.id.is_empty(), "item id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let data = rmp_serde::to_vec_named(item)?;
            let mut items = write_txn.open_table(ITEMS)?;
            items.insert(item.id.as_str(), data.as_slice())?;

            // Maintain insertion order
            let mut sequences = write_txn.open_table(ITEM_SEQUENCE)?;
            let existing = sequences.get(item.id.as_str())?.map(|v| v.value());
            if existing.is_none() {
                let mut order = write_txn.open_table(ITEM_ORDER)?;
                let next = order.last()?.map(|(k, _)| k.value() + 1).unwrap_or(0);
                order.insert(next, item.id.as_str())?;
                sequences.insert(item.id.as_str(), next)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_item(&self, id: &str) -> Result<ItemRecord, MetadataError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ITEMS)?;

        match table.get(id)? {
            Some(data) => Ok(rmp_serde::from_slice(data.value())?),
            None => Err(MetadataError::NotFound(id.to_string())),
        }
    }

    fn delete_item(&self, id: &str) -> Result<(), MetadataError> {
        let write_txn = self.begin_write()?;

        let removed = {
            let mut table = write_txn.open_table(ITEMS)?;
            let result = table.remove(id)?.is_some();
            result
        };

        if !removed {
            write_txn.abort()?;
            return Err(MetadataError::NotFound(id.to_string()));
        }

        {
            let mut sequences = write_txn.open_table(ITEM_SEQUENCE)?;
            let sequence = sequences.remove(id)?.map(|v| v.value());
            if let Some(sequence) = sequence {
                let mut order = write_txn.open_table(ITEM_ORDER)?;
                order.remove(sequence)?;
            }
        }

        write_txn.commit()?;
        Ok(())
    }

    fn ordered_items(&self) -> Result<Vec<ItemRecord>, MetadataError> {
        let read_txn = self.begin_read()?;
        let order = read_txn.open_table(ITEM_ORDER)?;
        let items = read_txn.open_table(ITEMS)?;

        let mut records = Vec::new();
        for result in order.iter()? {
            let (_, id) = result?;
            match items.get(id.value())? {
                Some(data) => records.push(rmp_serde::from_slice(data.value())?),
                None => {
                    tracing::warn!(item_id = %id.value(), "Order entry without item record");
                }
            }
        }

        Ok(records)
    }
}
