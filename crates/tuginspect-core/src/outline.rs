//! Symbol outline contract.
//!
//! The outline provider is an external collaborator (usually a language
//! server) that lists the class and method declarations of a document with
//! their current ranges. [`StaticOutline`] is a table-backed provider used
//! by the replay driver and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{InspectError, InspectResult};
use crate::text::DocumentSnapshot;
use crate::types::{DocumentKey, SymbolDescriptor};

/// Source of class and method symbols for a document.
#[async_trait]
pub trait SymbolOutline: Send + Sync {
    /// All class and method symbols of the document, flattened.
    async fn symbols(&self, document: &DocumentSnapshot) -> InspectResult<Vec<SymbolDescriptor>>;
}

/// Class and method symbols of `document` ordered by start line.
///
/// An outline failure is logged and read as "no symbols": callers on the
/// re-render path show nothing rather than fail.
pub async fn classes_and_methods(
    outline: &dyn SymbolOutline,
    document: &DocumentSnapshot,
) -> Vec<SymbolDescriptor> {
    match outline.symbols(document).await {
        Ok(mut symbols) => {
            symbols.sort_by_key(|s| (s.range.start.line, s.range.end.line));
            symbols
        }
        Err(e) => {
            tracing::warn!("symbol outline failed for {}: {}", document.key(), e);
            Vec::new()
        }
    }
}

/// Outline provider backed by an explicit symbol table per document.
#[derive(Debug, Default)]
pub struct StaticOutline {
    table: RwLock<HashMap<DocumentKey, Vec<SymbolDescriptor>>>,
}

impl StaticOutline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the symbols known for a document.
    pub fn set(&self, key: DocumentKey, symbols: Vec<SymbolDescriptor>) {
        if let Ok(mut table) = self.table.write() {
            table.insert(key, symbols);
        }
    }

    /// Find a symbol by name.
    pub fn find(&self, key: &DocumentKey, name: &str) -> Option<SymbolDescriptor> {
        let table = self.table.read().ok()?;
        table.get(key)?.iter().find(|s| s.name == name).cloned()
    }
}

#[async_trait]
impl SymbolOutline for StaticOutline {
    async fn symbols(&self, document: &DocumentSnapshot) -> InspectResult<Vec<SymbolDescriptor>> {
        let table = self
            .table
            .read()
            .map_err(|_| InspectError::Outline {
                message: "outline table poisoned".to_string(),
            })?;
        Ok(table.get(document.key()).cloned().unwrap_or_default())
    }
}
