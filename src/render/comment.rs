//! Inline comment threads, reconciled by inspection identity.
//!
//! Every rendered thread holds exactly one comment and is tagged with the id
//! of the inspection behind it. Rendering a new inspection list diffs ids:
//!
//! - ids in both the rendered set and the new list: thread kept untouched
//! - ids only in the new list: thread created
//! - ids only in the rendered set: thread disposed
//!
//! Afterwards the rendered ids equal the new list's ids exactly. Matching is
//! by exact id only; a regenerated inspection is a new thread even when its
//! text is identical.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tuginspect_core::error::RenderError;
use tuginspect_core::{DocumentKey, DocumentSnapshot, Inspection, InspectionId};

use super::surface::{EditorSurface, ThreadHandle, ThreadSpec};
use super::{not_installed, RendererKind, RendererStrategy};

/// Label shown on every thread.
pub const COMMENT_LABEL: &str = "Rewriting Suggestions";

/// Author shown on every comment.
pub const COMMENT_AUTHOR: &str = "Inspector";

/// A thread on the surface and the inspection it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedThread {
    pub handle: ThreadHandle,
    pub inspection: InspectionId,
}

/// Keep/add/remove operations turning a rendered set into a new one.
#[derive(Debug)]
pub struct ThreadPlan<'a> {
    pub keep: Vec<RenderedThread>,
    pub add: Vec<&'a Inspection>,
    pub remove: Vec<RenderedThread>,
}

impl ThreadPlan<'_> {
    pub fn is_noop(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Diff `rendered` against `inspections` by id.
///
/// A second thread rendered for an id already kept is removed, and an id
/// repeated in `inspections` is added once.
pub fn plan<'a>(rendered: &[RenderedThread], inspections: &'a [Inspection]) -> ThreadPlan<'a> {
    let new_ids: HashSet<&InspectionId> = inspections.iter().map(|i| &i.id).collect();

    let mut kept_ids: HashSet<InspectionId> = HashSet::new();
    let mut keep = Vec::new();
    let mut remove = Vec::new();
    for thread in rendered {
        if new_ids.contains(&thread.inspection) && kept_ids.insert(thread.inspection.clone()) {
            keep.push(thread.clone());
        } else {
            remove.push(thread.clone());
        }
    }

    let mut seen: HashSet<&InspectionId> = HashSet::new();
    let mut add = Vec::new();
    for inspection in inspections {
        if !kept_ids.contains(&inspection.id) && seen.insert(&inspection.id) {
            add.push(inspection);
        }
    }

    ThreadPlan { keep, add, remove }
}

pub struct CommentRenderer {
    surface: Arc<dyn EditorSurface>,
    installed: bool,
    threads: HashMap<DocumentKey, Vec<RenderedThread>>,
}

impl CommentRenderer {
    pub fn new(surface: Arc<dyn EditorSurface>) -> Self {
        CommentRenderer {
            surface,
            installed: false,
            threads: HashMap::new(),
        }
    }

    /// Threads currently rendered for a document.
    pub fn threads_of(&self, key: &DocumentKey) -> &[RenderedThread] {
        self.threads.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn thread_spec(document: &DocumentSnapshot, inspection: &Inspection) -> ThreadSpec {
        ThreadSpec {
            inspection: inspection.id.clone(),
            range: inspection.indicator_range(document),
            label: COMMENT_LABEL.to_string(),
            author: COMMENT_AUTHOR.to_string(),
            body: inspection.message(),
            can_reply: false,
        }
    }
}

impl RendererStrategy for CommentRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Comments
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn install(&mut self) {
        if self.installed {
            return;
        }
        tracing::debug!("install comment renderer");
        self.installed = true;
    }

    fn uninstall(&mut self) {
        if !self.installed {
            return;
        }
        tracing::debug!("uninstall comment renderer");
        for thread in self.threads.drain().flat_map(|(_, threads)| threads) {
            self.surface.dispose_thread(thread.handle);
        }
        self.installed = false;
    }

    /// Threads follow their anchor lines on the surface; reconciliation
    /// alone decides which survive.
    fn clear(&mut self, _document: Option<&DocumentKey>) -> Result<(), RenderError> {
        Ok(())
    }

    fn render_inspections(
        &mut self,
        document: &DocumentSnapshot,
        inspections: &[Inspection],
    ) -> Result<(), RenderError> {
        if !self.installed {
            return Err(not_installed(self.kind()));
        }
        let rendered = self.threads.remove(document.key()).unwrap_or_default();
        let plan = plan(&rendered, inspections);
        if !plan.is_noop() {
            tracing::debug!(
                "comments of {}: keep {}, add {}, remove {}",
                document.key(),
                plan.keep.len(),
                plan.add.len(),
                plan.remove.len()
            );
        }

        for thread in &plan.remove {
            self.surface.dispose_thread(thread.handle);
        }

        let mut next = plan.keep;
        let mut failure = None;
        for inspection in plan.add {
            let spec = Self::thread_spec(document, inspection);
            match self.surface.create_thread(document.key(), spec) {
                Ok(handle) => next.push(RenderedThread {
                    handle,
                    inspection: inspection.id.clone(),
                }),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        self.threads.insert(document.key().clone(), next);

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
