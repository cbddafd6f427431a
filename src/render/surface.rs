//! The editor drawing boundary.
//!
//! Renderer strategies never talk to a platform API directly. They draw
//! through an [`EditorSurface`]: comment threads are created and disposed
//! one by one, every other channel is replaced wholesale per document.
//!
//! [`MemorySurface`] records everything in process. The replay driver
//! prints its [`SurfaceSnapshot`] after every step and tests assert on it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use tuginspect_core::error::RenderError;
use tuginspect_core::{DocumentKey, InspectionId, Range};

/// Handle of a comment thread created on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ThreadHandle(pub u64);

/// A single-comment thread to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSpec {
    pub inspection: InspectionId,
    pub range: Range,
    pub label: String,
    pub author: String,
    pub body: String,
    pub can_reply: bool,
}

/// A line-anchored item of the diagnostics, gutter icon or code lens
/// channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub inspection: InspectionId,
    pub range: Range,
    pub text: String,
}

/// An "inspect this class" action lens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectAction {
    pub symbol: String,
    pub range: Range,
    pub title: String,
}

/// Platform drawing API.
pub trait EditorSurface: Send + Sync {
    fn create_thread(&self, key: &DocumentKey, spec: ThreadSpec) -> Result<ThreadHandle, RenderError>;

    fn dispose_thread(&self, handle: ThreadHandle);

    fn set_diagnostics(&self, key: &DocumentKey, items: Vec<Annotation>) -> Result<(), RenderError>;

    fn set_gutter_icons(&self, key: &DocumentKey, items: Vec<Annotation>) -> Result<(), RenderError>;

    fn set_code_lenses(&self, key: &DocumentKey, items: Vec<Annotation>) -> Result<(), RenderError>;

    /// Whole-line overview ruler marks. Only meaningful for visible documents.
    fn set_ruler_highlights(&self, key: &DocumentKey, lines: Vec<Range>) -> Result<(), RenderError>;

    fn set_inspect_actions(&self, key: &DocumentKey, actions: Vec<InspectAction>);

    /// Whether the document is shown in an editor.
    fn is_visible(&self, key: &DocumentKey) -> bool;
}

// ============================================================================
// In-memory surface
// ============================================================================

#[derive(Debug, Default)]
struct SurfaceState {
    visible: BTreeSet<DocumentKey>,
    next_thread: u64,
    threads: BTreeMap<ThreadHandle, (DocumentKey, ThreadSpec)>,
    diagnostics: BTreeMap<DocumentKey, Vec<Annotation>>,
    gutter_icons: BTreeMap<DocumentKey, Vec<Annotation>>,
    code_lenses: BTreeMap<DocumentKey, Vec<Annotation>>,
    ruler: BTreeMap<DocumentKey, Vec<Range>>,
    actions: BTreeMap<DocumentKey, Vec<InspectAction>>,
    created: usize,
    disposed: usize,
}

/// Recording surface.
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: Mutex<SurfaceState>,
}

/// Serializable view of what a surface currently shows for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentView {
    /// Lines of comment threads with their bodies, in creation order.
    pub threads: Vec<(u32, String)>,
    pub diagnostics: Vec<(u32, String)>,
    pub gutter_icons: Vec<(u32, String)>,
    pub code_lenses: Vec<(u32, String)>,
    pub ruler: Vec<u32>,
    pub actions: Vec<(u32, String)>,
}

/// Everything a [`MemorySurface`] shows, keyed by document path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SurfaceSnapshot {
    pub documents: BTreeMap<String, DocumentView>,
    pub threads_created: usize,
    pub threads_disposed: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the set of visible documents.
    pub fn set_visible<'a>(&self, keys: impl IntoIterator<Item = &'a DocumentKey>) {
        let mut state = self.state();
        state.visible = keys.into_iter().cloned().collect();
    }

    /// Live threads of a document, oldest first.
    pub fn threads_of(&self, key: &DocumentKey) -> Vec<(ThreadHandle, ThreadSpec)> {
        self.state()
            .threads
            .iter()
            .filter(|(_, (k, _))| k == key)
            .map(|(handle, (_, spec))| (*handle, spec.clone()))
            .collect()
    }

    pub fn diagnostics_of(&self, key: &DocumentKey) -> Vec<Annotation> {
        self.state().diagnostics.get(key).cloned().unwrap_or_default()
    }

    pub fn gutter_icons_of(&self, key: &DocumentKey) -> Vec<Annotation> {
        self.state().gutter_icons.get(key).cloned().unwrap_or_default()
    }

    pub fn code_lenses_of(&self, key: &DocumentKey) -> Vec<Annotation> {
        self.state().code_lenses.get(key).cloned().unwrap_or_default()
    }

    pub fn ruler_of(&self, key: &DocumentKey) -> Vec<Range> {
        self.state().ruler.get(key).cloned().unwrap_or_default()
    }

    pub fn actions_of(&self, key: &DocumentKey) -> Vec<InspectAction> {
        self.state().actions.get(key).cloned().unwrap_or_default()
    }

    /// Total threads ever created.
    pub fn threads_created(&self) -> usize {
        self.state().created
    }

    /// Total threads ever disposed.
    pub fn threads_disposed(&self) -> usize {
        self.state().disposed
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        let state = self.state();
        let mut documents: BTreeMap<String, DocumentView> = BTreeMap::new();

        for (key, spec) in state.threads.values() {
            view(&mut documents, key).threads.push((spec.range.start.line, spec.body.clone()));
        }
        for (key, items) in &state.diagnostics {
            view(&mut documents, key).diagnostics = lines_and_text(items);
        }
        for (key, items) in &state.gutter_icons {
            view(&mut documents, key).gutter_icons = lines_and_text(items);
        }
        for (key, items) in &state.code_lenses {
            view(&mut documents, key).code_lenses = lines_and_text(items);
        }
        for (key, lines) in &state.ruler {
            let mut ruler: Vec<u32> = lines.iter().map(|r| r.start.line).collect();
            ruler.sort_unstable();
            view(&mut documents, key).ruler = ruler;
        }
        for (key, actions) in &state.actions {
            view(&mut documents, key).actions = actions
                .iter()
                .map(|a| (a.range.start.line, a.title.clone()))
                .collect();
        }
        documents.retain(|_, v| *v != DocumentView::default());

        SurfaceSnapshot {
            documents,
            threads_created: state.created,
            threads_disposed: state.disposed,
        }
    }
}

fn view<'a>(documents: &'a mut BTreeMap<String, DocumentView>, key: &DocumentKey) -> &'a mut DocumentView {
    documents.entry(key.to_string()).or_default()
}

fn lines_and_text(items: &[Annotation]) -> Vec<(u32, String)> {
    let mut out: Vec<(u32, String)> = items
        .iter()
        .map(|a| (a.range.start.line, a.text.clone()))
        .collect();
    out.sort();
    out
}

/// Store `value` under `key`, dropping the key when the value is empty.
fn replace<T>(map: &mut BTreeMap<DocumentKey, Vec<T>>, key: &DocumentKey, value: Vec<T>) {
    if value.is_empty() {
        map.remove(key);
    } else {
        map.insert(key.clone(), value);
    }
}

impl EditorSurface for MemorySurface {
    fn create_thread(&self, key: &DocumentKey, spec: ThreadSpec) -> Result<ThreadHandle, RenderError> {
        let mut state = self.state();
        state.next_thread += 1;
        let handle = ThreadHandle(state.next_thread);
        state.threads.insert(handle, (key.clone(), spec));
        state.created += 1;
        Ok(handle)
    }

    fn dispose_thread(&self, handle: ThreadHandle) {
        let mut state = self.state();
        if state.threads.remove(&handle).is_some() {
            state.disposed += 1;
        }
    }

    fn set_diagnostics(&self, key: &DocumentKey, items: Vec<Annotation>) -> Result<(), RenderError> {
        replace(&mut self.state().diagnostics, key, items);
        Ok(())
    }

    fn set_gutter_icons(&self, key: &DocumentKey, items: Vec<Annotation>) -> Result<(), RenderError> {
        replace(&mut self.state().gutter_icons, key, items);
        Ok(())
    }

    fn set_code_lenses(&self, key: &DocumentKey, items: Vec<Annotation>) -> Result<(), RenderError> {
        replace(&mut self.state().code_lenses, key, items);
        Ok(())
    }

    fn set_ruler_highlights(&self, key: &DocumentKey, lines: Vec<Range>) -> Result<(), RenderError> {
        let mut state = self.state();
        if !lines.is_empty() && !state.visible.contains(key) {
            return Err(RenderError::Surface(format!("{} is not visible", key)));
        }
        replace(&mut state.ruler, key, lines);
        Ok(())
    }

    fn set_inspect_actions(&self, key: &DocumentKey, actions: Vec<InspectAction>) {
        replace(&mut self.state().actions, key, actions);
    }

    fn is_visible(&self, key: &DocumentKey) -> bool {
        self.state().visible.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(line: u32, body: &str) -> ThreadSpec {
        ThreadSpec {
            inspection: InspectionId::generate(),
            range: Range::lines(line, line),
            label: "label".to_string(),
            author: "author".to_string(),
            body: body.to_string(),
            can_reply: false,
        }
    }

    #[test]
    fn threads_are_counted() {
        let surface = MemorySurface::new();
        let key = DocumentKey::new("Foo.java");
        let a = surface.create_thread(&key, spec(1, "a")).unwrap();
        let _b = surface.create_thread(&key, spec(2, "b")).unwrap();
        surface.dispose_thread(a);
        surface.dispose_thread(a);

        assert_eq!(surface.threads_created(), 2);
        assert_eq!(surface.threads_disposed(), 1);
        assert_eq!(surface.threads_of(&key).len(), 1);
    }

    #[test]
    fn ruler_requires_visible_document() {
        let surface = MemorySurface::new();
        let key = DocumentKey::new("Foo.java");
        assert!(surface
            .set_ruler_highlights(&key, vec![Range::lines(1, 1)])
            .is_err());
        surface.set_visible([&key]);
        assert!(surface
            .set_ruler_highlights(&key, vec![Range::lines(1, 1)])
            .is_ok());
        assert_eq!(surface.ruler_of(&key).len(), 1);
    }

    #[test]
    fn snapshot_omits_empty_documents() {
        let surface = MemorySurface::new();
        let key = DocumentKey::new("Foo.java");
        surface
            .set_diagnostics(
                &key,
                vec![Annotation {
                    inspection: InspectionId::generate(),
                    range: Range::lines(4, 4),
                    text: "d".to_string(),
                }],
            )
            .unwrap();
        surface.set_diagnostics(&DocumentKey::new("Bar.java"), vec![]).unwrap();

        let snapshot = surface.snapshot();
        assert_eq!(snapshot.documents.len(), 1);
        assert_eq!(snapshot.documents["Foo.java"].diagnostics, [(4, "d".to_string())]);
    }
}
