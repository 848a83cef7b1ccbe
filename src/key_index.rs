//! In-memory pagination index over uploaded items.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::storage::models::{ItemRecord, KeyMapEntry};

/// Entries per `/list` page.
pub const PAGE_SIZE: usize = 10;

/// Ordered list of (identifier, tag-time, position) entries, one per live
/// item, kept in insertion order.
#[derive(Debug, Default)]
pub struct KeyIndex {
    entries: Mutex<Vec<KeyMapEntry>>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from records already in insertion order.
    pub fn from_items(items: &[ItemRecord]) -> Self {
        let entries = items
            .iter()
            .enumerate()
            .map(|(position, item)| KeyMapEntry {
                id: item.id.clone(),
                tag_time: item.tag_time.clone(),
                position,
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<KeyMapEntry>> {
        // Every mutation leaves the Vec valid, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry whose position is the current index length.
    pub fn append(&self, id: &str, tag_time: &str) -> KeyMapEntry {
        let mut entries = self.lock();
        let entry = KeyMapEntry {
            id: id.to_string(),
            tag_time: tag_time.to_string(),
            position: entries.len(),
        };
        entries.push(entry.clone());
        entry
    }

    /// Remove the entry for `id`, preserving the order of the rest.
    pub fn remove_by_id(&self, id: &str) -> Option<KeyMapEntry> {
        let mut entries = self.lock();
        let index = entries.iter().position(|e| e.id == id)?;
        Some(entries.remove(index))
    }

    /// Copy of the half-open range `[start, end)`, clamped to the index length.
    pub fn slice(&self, start: usize, end: usize) -> Vec<KeyMapEntry> {
        let entries = self.lock();
        let end = end.min(entries.len());
        if start >= end {
            return Vec::new();
        }
        entries[start..end].to_vec()
    }

    /// Entries on a 1-based page of `PAGE_SIZE`.
    ///
    /// Pages at or below zero are treated as page 1; pages past the end
    /// are empty.
    pub fn page(&self, page: i64) -> Vec<KeyMapEntry> {
        let page = page.max(1);
        let skipped = usize::try_from(page - 1).unwrap_or(usize::MAX);
        let start = skipped.saturating_mul(PAGE_SIZE);
        let end = start.saturating_add(PAGE_SIZE);
        self.slice(start, end)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
