//! Core infrastructure for tuginspect.
//!
//! This crate provides the language-agnostic pieces of the inspection layer:
//! - Inspection and symbol data model
//! - Immutable document snapshots with line/character addressing
//! - Content fingerprints for symbol spans
//! - Symbol outline contract (classes and methods of a document)
//! - The incremental inspection cache
//! - Error types and error codes

pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod outline;
pub mod text;
pub mod types;

pub use cache::{
    BatchId, BatchOutcome, CacheEntry, CacheStats, CacheStore, EntryState, InspectionCache,
    MemoryCacheStore, PendingInspections,
};
pub use error::{InspectError, InspectResult, OutputErrorCode, RenderError};
pub use fingerprint::SymbolFingerprint;
pub use outline::{classes_and_methods, StaticOutline, SymbolOutline};
pub use text::DocumentSnapshot;
pub use types::{
    uncapitalize, DocumentKey, DocumentRef, Inspection, InspectionId, Position, Problem,
    ProblemPosition, Range, SymbolDescriptor, SymbolKind,
};
