//! Incremental, content-addressed inspection cache.
//!
//! Inspections are stored per `(document, symbol name)` together with the
//! fingerprint of the symbol text they were computed from. An entry is valid
//! exactly when the fingerprint of the symbol's *current* text matches; there
//! is no expiry and no size bound. Entries leave the cache only through
//! explicit invalidation or process teardown.
//!
//! # Coordinates
//!
//! Stored inspections carry a line relative to their symbol's first line.
//! Every read returns fresh copies rebased onto the symbol's current start
//! line, so a symbol that moved (edits above it) but kept its own text still
//! hits and its inspections land on the right lines.
//!
//! # In-flight computations
//!
//! [`InspectionCache::begin`] registers a deferred batch as `Pending` for the
//! symbols an inspector call covers. A reader hitting a pending entry awaits
//! the same computation instead of starting another. [`InspectionCache::settle`]
//! turns the batch into `Ready` or `Failed` entries; a failed entry reads as a
//! miss. An inspection ignored while its entry is still pending is remembered
//! on the entry and left out when the batch settles.

mod entry;
mod store;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use entry::{
    partition, partition_except, BatchId, BatchOutcome, CacheEntry, EntryState,
    PendingInspections,
};
pub use store::{CacheStore, MemoryCacheStore};

use serde::Serialize;

use crate::fingerprint::SymbolFingerprint;
use crate::outline::{classes_and_methods, SymbolOutline};
use crate::text::DocumentSnapshot;
use crate::types::{DocumentKey, Inspection, SymbolDescriptor};

/// Counts of what the cache currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub documents: usize,
    pub entries: usize,
    pub ready: usize,
    pub pending: usize,
    pub failed: usize,
}

/// Per-symbol inspection cache. Construct once per session and share it.
pub struct InspectionCache {
    store: Arc<dyn CacheStore>,
    next_batch: AtomicU64,
}

impl Default for InspectionCache {
    fn default() -> Self {
        Self::with_store(Arc::new(MemoryCacheStore::new()))
    }
}

impl InspectionCache {
    /// Create a cache over the in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache over the given storage.
    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        InspectionCache {
            store,
            next_batch: AtomicU64::new(1),
        }
    }

    /// Without a symbol: whether anything is cached for the document.
    /// With a symbol: whether its entry matches the symbol's current text.
    pub fn has_cache(&self, document: &DocumentSnapshot, symbol: Option<&SymbolDescriptor>) -> bool {
        let Some(symbol) = symbol else {
            return self.store.contains_document(document.key());
        };
        match self.store.get(document.key(), &symbol.name) {
            Some(entry) => {
                entry.state.is_servable()
                    && entry.fingerprint == SymbolFingerprint::compute(document, &symbol.range)
            }
            None => false,
        }
    }

    /// Cached inspections of a symbol rebased onto its current location, or
    /// `None` on a miss.
    ///
    /// A pending entry is awaited; a batch that failed reads as a miss.
    pub async fn get_cached_inspections_of_symbol(
        &self,
        document: &DocumentSnapshot,
        symbol: &SymbolDescriptor,
    ) -> Option<Vec<Inspection>> {
        let entry = self.lookup(document, symbol)?;
        let stored: Arc<[Inspection]> = match entry.state {
            EntryState::Ready(list) => list,
            EntryState::Pending {
                inspections,
                ignored,
                ..
            } => match inspections.wait().await {
                Ok(all) => partition_except(&all, &entry.anchor, &ignored).into(),
                Err(e) => {
                    tracing::debug!(
                        "cache miss for {} of {}: pending batch failed: {}",
                        symbol,
                        document.key(),
                        e
                    );
                    return None;
                }
            },
            EntryState::Failed(_) => {
                tracing::debug!("cache miss for {} of {}: failed entry", symbol, document.key());
                return None;
            }
        };
        tracing::debug!("cache hit for {} of {}", symbol, document.key());
        Some(
            stored
                .iter()
                .map(|inspection| rebase(inspection, document, symbol))
                .collect(),
        )
    }

    /// All still-valid cached inspections of a document. Misses are skipped;
    /// nothing is recomputed.
    pub async fn get_cached_inspections_of_doc(
        &self,
        outline: &dyn SymbolOutline,
        document: &DocumentSnapshot,
    ) -> Vec<Inspection> {
        let mut inspections = Vec::new();
        for symbol in classes_and_methods(outline, document).await {
            if let Some(cached) = self.get_cached_inspections_of_symbol(document, &symbol).await {
                inspections.extend(cached);
            }
        }
        inspections
    }

    /// Partition `all` among `symbols` and store each non-empty share.
    ///
    /// Methods own inspections anywhere in their span, classes only those on
    /// their declaration line. Symbols with no share keep their existing
    /// entry.
    pub fn cache(&self, all: &[Inspection], symbols: &[SymbolDescriptor], document: &DocumentSnapshot) {
        if all.is_empty() {
            return;
        }
        for symbol in symbols {
            let owned = partition(all, symbol);
            if owned.is_empty() {
                continue;
            }
            tracing::debug!(
                "cache {} inspections for {} of {}",
                owned.len(),
                symbol,
                document.key()
            );
            let entry = CacheEntry::ready(
                SymbolFingerprint::compute(document, &symbol.range),
                symbol.clone(),
                owned,
            );
            self.store.put(document.key(), &symbol.name, entry);
        }
    }

    /// Register an in-flight inspector call for `symbols`.
    pub fn begin(
        &self,
        document: &DocumentSnapshot,
        symbols: &[SymbolDescriptor],
        pending: PendingInspections,
    ) -> BatchId {
        let batch = BatchId(self.next_batch.fetch_add(1, Ordering::Relaxed));
        for symbol in symbols {
            tracing::debug!("pending batch {} for {} of {}", batch.0, symbol, document.key());
            let entry = CacheEntry {
                fingerprint: SymbolFingerprint::compute(document, &symbol.range),
                anchor: symbol.clone(),
                state: EntryState::Pending {
                    batch,
                    inspections: pending.clone(),
                    ignored: Vec::new(),
                },
            };
            self.store.put(document.key(), &symbol.name, entry);
        }
        batch
    }

    /// Resolve the entries still pending on `batch`.
    ///
    /// Entries overwritten since [`begin`](Self::begin) are left alone.
    pub fn settle(&self, key: &DocumentKey, batch: BatchId, outcome: &BatchOutcome) {
        for (name, _) in self.store.entries_of(key) {
            self.store.update(key, &name, &mut |entry| {
                let ignored = match &entry.state {
                    EntryState::Pending {
                        batch: b, ignored, ..
                    } if *b == batch => ignored.clone(),
                    _ => return,
                };
                entry.state = match outcome {
                    Ok(all) => {
                        EntryState::Ready(partition_except(all, &entry.anchor, &ignored).into())
                    }
                    Err(e) => EntryState::Failed(e.clone()),
                };
                tracing::debug!(
                    "settled batch {} for {} of {}: {}",
                    batch.0,
                    entry.anchor,
                    key,
                    entry.state.label()
                );
            });
        }
    }

    /// Drop cached state.
    ///
    /// - symbol only: remove the symbol's entry
    /// - inspection (with or without symbol): remove that inspection from the
    ///   entry that holds it
    /// - neither: remove every entry of the document
    ///
    /// Returns whether anything was removed.
    pub fn invalidate_inspection_cache(
        &self,
        key: &DocumentKey,
        symbol: Option<&SymbolDescriptor>,
        inspection: Option<&Inspection>,
    ) -> bool {
        match (symbol, inspection) {
            (None, None) => self.store.remove_document(key) > 0,
            (Some(symbol), None) => {
                tracing::debug!("invalidate {} of {}", symbol, key);
                self.store.remove(key, &symbol.name).is_some()
            }
            (symbol, Some(inspection)) => {
                let owner = symbol
                    .map(|s| s.name.clone())
                    .or_else(|| inspection.symbol.as_ref().map(|s| s.name.clone()));
                let names: Vec<String> = match owner {
                    Some(name) => vec![name],
                    None => self.store.entries_of(key).into_iter().map(|(n, _)| n).collect(),
                };
                let mut removed = false;
                for name in names {
                    self.store.update(key, &name, &mut |entry| {
                        let anchor = entry.anchor.clone();
                        match &mut entry.state {
                            EntryState::Ready(list) => {
                                if list.iter().any(|i| i.id == inspection.id) {
                                    let kept: Vec<Inspection> = list
                                        .iter()
                                        .filter(|i| i.id != inspection.id)
                                        .cloned()
                                        .collect();
                                    entry.state = EntryState::Ready(kept.into());
                                    removed = true;
                                }
                            }
                            EntryState::Pending {
                                inspections,
                                ignored,
                                ..
                            } => {
                                // Only a finished batch can have handed out the id.
                                let owned = matches!(
                                    inspections.peek(),
                                    Some(Ok(all)) if partition(all, &anchor)
                                        .iter()
                                        .any(|i| i.id == inspection.id)
                                );
                                if owned && !ignored.contains(&inspection.id) {
                                    ignored.push(inspection.id.clone());
                                    removed = true;
                                }
                            }
                            EntryState::Failed(_) => {}
                        }
                    });
                    if removed {
                        tracing::debug!("ignored inspection {} of {}", inspection.id, key);
                        break;
                    }
                }
                removed
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for key in self.store.documents() {
            stats.documents += 1;
            for (_, entry) in self.store.entries_of(&key) {
                stats.entries += 1;
                match entry.state {
                    EntryState::Pending { .. } => stats.pending += 1,
                    EntryState::Ready(_) => stats.ready += 1,
                    EntryState::Failed(_) => stats.failed += 1,
                }
            }
        }
        stats
    }

    fn lookup(&self, document: &DocumentSnapshot, symbol: &SymbolDescriptor) -> Option<CacheEntry> {
        let Some(entry) = self.store.get(document.key(), &symbol.name) else {
            tracing::debug!("cache miss for {} of {}", symbol, document.key());
            return None;
        };
        if entry.fingerprint != SymbolFingerprint::compute(document, &symbol.range) {
            tracing::debug!(
                "cache miss for {} of {}: text changed ({} != {})",
                symbol,
                document.key(),
                entry.fingerprint,
                SymbolFingerprint::compute(document, &symbol.range)
            );
            return None;
        }
        Some(entry)
    }
}

/// Fresh copy of a stored inspection placed on the symbol's current lines.
fn rebase(stored: &Inspection, document: &DocumentSnapshot, symbol: &SymbolDescriptor) -> Inspection {
    let mut inspection = stored.clone();
    inspection.document = Some(document.reference());
    inspection.problem.position.line =
        inspection.problem.position.relative_line + symbol.range.start.line;
    inspection
}

// ============================================================================
// Tests
// ============================================================================
