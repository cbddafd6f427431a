//! Storage behind the inspection cache.
//!
//! The cache talks to a [`CacheStore`] so the map can be swapped or shared.
//! Implementations must serialize mutations; the in-memory store does so
//! with a single `RwLock`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::entry::CacheEntry;
use crate::types::DocumentKey;

/// Key-value storage of cache entries keyed by `(document, symbol name)`.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &DocumentKey, symbol: &str) -> Option<CacheEntry>;

    fn put(&self, key: &DocumentKey, symbol: &str, entry: CacheEntry);

    fn remove(&self, key: &DocumentKey, symbol: &str) -> Option<CacheEntry>;

    /// Drop every entry of a document, returning how many were removed.
    fn remove_document(&self, key: &DocumentKey) -> usize;

    /// Mutate an entry in place under the store's lock.
    ///
    /// Returns false when the entry does not exist.
    fn update(
        &self,
        key: &DocumentKey,
        symbol: &str,
        f: &mut dyn FnMut(&mut CacheEntry),
    ) -> bool;

    /// Whether any entry exists for the document.
    fn contains_document(&self, key: &DocumentKey) -> bool;

    /// Snapshot of a document's entries.
    fn entries_of(&self, key: &DocumentKey) -> Vec<(String, CacheEntry)>;

    fn documents(&self) -> Vec<DocumentKey>;
}

/// Process-lifetime in-memory store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<DocumentKey, HashMap<String, CacheEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &DocumentKey, symbol: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key)?.get(symbol).cloned()
    }

    fn put(&self, key: &DocumentKey, symbol: &str, entry: CacheEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(key.clone())
            .or_default()
            .insert(symbol.to_string(), entry);
    }

    fn remove(&self, key: &DocumentKey, symbol: &str) -> Option<CacheEntry> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let symbols = entries.get_mut(key)?;
        let removed = symbols.remove(symbol);
        if symbols.is_empty() {
            entries.remove(key);
        }
        removed
    }

    fn remove_document(&self, key: &DocumentKey) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).map(|symbols| symbols.len()).unwrap_or(0)
    }

    fn update(
        &self,
        key: &DocumentKey,
        symbol: &str,
        f: &mut dyn FnMut(&mut CacheEntry),
    ) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(key).and_then(|symbols| symbols.get_mut(symbol)) {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }

    fn contains_document(&self, key: &DocumentKey) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(key)
    }

    fn entries_of(&self, key: &DocumentKey) -> Vec<(String, CacheEntry)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .map(|symbols| {
                symbols
                    .iter()
                    .map(|(name, entry)| (name.clone(), entry.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn documents(&self) -> Vec<DocumentKey> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<_> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}
