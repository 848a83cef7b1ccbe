use redb::TableDefinition;

/// Item records: identifier -> ItemRecord (msgpack)
pub const ITEMS: TableDefinition<&str, &[u8]> = TableDefinition::new("items");

/// Insertion order: sequence -> identifier (for rebuilding the key index)
pub const ITEM_ORDER: TableDefinition<u64, &str> = TableDefinition::new("item_order");

/// Reverse of ITEM_ORDER: identifier -> sequence (for delete cleanup)
pub const ITEM_SEQUENCE: TableDefinition<&str, u64> = TableDefinition::new("item_sequence");
