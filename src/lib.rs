//! tuginspect: incremental AI inspection cache and renderer reconciliation
//!
//! Inspections produced by a language model are cached per class and method
//! symbol, replayed as the document is edited, and drawn through a set of
//! independently switchable renderers (diagnostics, gutter icons, code
//! lenses, overview ruler, comment threads).

// Core infrastructure - re-exported from tuginspect-core
pub use tuginspect_core::cache;
pub use tuginspect_core::error;
pub use tuginspect_core::fingerprint;
pub use tuginspect_core::outline;
pub use tuginspect_core::text;
pub use tuginspect_core::types;

pub mod config;
pub mod debounce;
pub mod inspector;
pub mod notify;
pub mod output;
pub mod render;
pub mod replay;
pub mod session;
