//! Cache entry states.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::fingerprint::SymbolFingerprint;
use crate::types::{Inspection, InspectionId, SymbolDescriptor};

/// Outcome of one inspector call, shared by every symbol it covers.
///
/// The error side is the rendered failure message so the outcome stays
/// cloneable across waiters.
pub type BatchOutcome = Result<Arc<[Inspection]>, String>;

/// Identifies one in-flight inspector call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

/// Deferred result of an in-flight inspector call.
///
/// Cloning is cheap and every clone observes the same single computation.
#[derive(Clone)]
pub struct PendingInspections(Shared<BoxFuture<'static, BatchOutcome>>);

impl PendingInspections {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = BatchOutcome> + Send + 'static,
    {
        PendingInspections(future.boxed().shared())
    }

    /// Wait for the batch to finish.
    pub async fn wait(&self) -> BatchOutcome {
        self.0.clone().await
    }

    /// The outcome, if the batch already finished.
    pub fn peek(&self) -> Option<&BatchOutcome> {
        self.0.peek()
    }
}

impl fmt::Debug for PendingInspections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(Ok(list)) => write!(f, "PendingInspections(done: {})", list.len()),
            Some(Err(e)) => write!(f, "PendingInspections(failed: {})", e),
            None => write!(f, "PendingInspections(in flight)"),
        }
    }
}

/// State of one `(document, symbol)` entry.
#[derive(Debug, Clone)]
pub enum EntryState {
    /// An inspector call covering this symbol has not been settled.
    Pending {
        batch: BatchId,
        inspections: PendingInspections,
        /// Ids ignored before the batch settled; dropped from its share.
        ignored: Vec<InspectionId>,
    },
    /// Inspections owned by the symbol, with relative lines set.
    Ready(Arc<[Inspection]>),
    /// The inspector call failed; reads as a miss.
    Failed(String),
}

impl EntryState {
    pub fn is_servable(&self) -> bool {
        !matches!(self, EntryState::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryState::Pending { .. } => "pending",
            EntryState::Ready(_) => "ready",
            EntryState::Failed(_) => "failed",
        }
    }
}

/// A cached inspection set for one symbol.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Fingerprint of the symbol text the inspections were computed from.
    pub fingerprint: SymbolFingerprint,
    /// The symbol as it was when the entry was written.
    pub anchor: SymbolDescriptor,
    pub state: EntryState,
}

impl CacheEntry {
    pub fn ready(
        fingerprint: SymbolFingerprint,
        anchor: SymbolDescriptor,
        inspections: Vec<Inspection>,
    ) -> Self {
        CacheEntry {
            fingerprint,
            anchor,
            state: EntryState::Ready(inspections.into()),
        }
    }
}

/// The share of `all` owned by `symbol`, minus the `ignored` ids.
pub fn partition_except(
    all: &[Inspection],
    symbol: &SymbolDescriptor,
    ignored: &[InspectionId],
) -> Vec<Inspection> {
    let mut owned = partition(all, symbol);
    owned.retain(|i| !ignored.contains(&i.id));
    owned
}

/// Inspections of `all` owned by `symbol`, as fresh copies whose relative
/// line is measured from the symbol's first line.
pub fn partition(all: &[Inspection], symbol: &SymbolDescriptor) -> Vec<Inspection> {
    all.iter()
        .filter(|inspection| symbol.owns_line(inspection.line()))
        .map(|inspection| {
            let mut owned = inspection.clone();
            owned.problem.position.relative_line =
                inspection.line().saturating_sub(symbol.range.start.line);
            owned.symbol = Some(symbol.clone());
            owned
        })
        .collect()
}
