//! Overview ruler highlights.
//!
//! Highlights are coarse whole-line marks that persist across partial
//! re-renders. Their identity is the trimmed solution text, not the
//! inspection id: a new batch replaces only the highlights whose solution
//! it repeats and keeps every other previously rendered highlight. Stale
//! highlights are never disposed one by one; they go when superseded or
//! when the document is cleared.

use std::collections::HashMap;
use std::sync::Arc;

use tuginspect_core::error::RenderError;
use tuginspect_core::{DocumentKey, DocumentSnapshot, Inspection, Range};

use super::surface::EditorSurface;
use super::{merge_leftover, not_installed, Drawn, RendererKind, RendererStrategy};

pub struct RulerHighlightRenderer {
    surface: Arc<dyn EditorSurface>,
    installed: bool,
    highlights: HashMap<DocumentKey, Vec<Drawn>>,
}

impl RulerHighlightRenderer {
    pub fn new(surface: Arc<dyn EditorSurface>) -> Self {
        RulerHighlightRenderer {
            surface,
            installed: false,
            highlights: HashMap::new(),
        }
    }

    /// Solution texts currently highlighted in a document.
    pub fn solutions_of(&self, key: &DocumentKey) -> Vec<String> {
        self.highlights
            .get(key)
            .map(|list| {
                list.iter()
                    .map(|d| d.inspection.solution_key().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn wipe(&self, key: &DocumentKey) -> Result<(), RenderError> {
        self.surface.set_ruler_highlights(key, Vec::new())
    }
}

impl RendererStrategy for RulerHighlightRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::RulerHighlights
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn install(&mut self) {
        if self.installed {
            return;
        }
        tracing::debug!("install ruler highlight renderer");
        self.installed = true;
    }

    fn uninstall(&mut self) {
        if !self.installed {
            return;
        }
        tracing::debug!("uninstall ruler highlight renderer");
        let keys: Vec<DocumentKey> = self.highlights.drain().map(|(key, _)| key).collect();
        for key in keys {
            if let Err(e) = self.wipe(&key) {
                tracing::debug!("ruler wipe of {} failed: {}", key, e);
            }
        }
        self.installed = false;
    }

    fn clear(&mut self, document: Option<&DocumentKey>) -> Result<(), RenderError> {
        if !self.installed {
            return Ok(());
        }
        let keys: Vec<DocumentKey> = match document {
            Some(key) => vec![key.clone()],
            None => self.highlights.keys().cloned().collect(),
        };
        let mut result = Ok(());
        for key in keys {
            self.highlights.remove(&key);
            result = result.and(self.wipe(&key));
        }
        result
    }

    fn render_inspections(
        &mut self,
        document: &DocumentSnapshot,
        inspections: &[Inspection],
    ) -> Result<(), RenderError> {
        if !self.installed {
            return Err(not_installed(self.kind()));
        }
        if inspections.is_empty() || !self.surface.is_visible(document.key()) {
            return Ok(());
        }
        let fresh: Vec<Drawn> = inspections
            .iter()
            .map(|i| Drawn {
                range: i.hint_range(document),
                inspection: i.clone(),
            })
            .collect();
        let previous = self.highlights.remove(document.key()).unwrap_or_default();
        let merged = merge_leftover(fresh, &previous, |d| {
            d.inspection.solution_key().to_string()
        });
        let lines: Vec<Range> = merged
            .iter()
            .map(|d| Range::lines(d.range.start.line, d.range.start.line))
            .collect();
        self.highlights.insert(document.key().clone(), merged);
        self.surface.set_ruler_highlights(document.key(), lines)
    }
}
