//! Diagnostics channel: one hint-severity diagnostic per inspection.

use std::collections::HashMap;
use std::sync::Arc;

use tuginspect_core::error::RenderError;
use tuginspect_core::{DocumentKey, DocumentSnapshot, Inspection};

use super::surface::EditorSurface;
use super::{merge_leftover, not_installed, Drawn, RendererKind, RendererStrategy};

/// Diagnostics keyed by inspection id. A re-render replaces diagnostics of
/// the same inspection and keeps the others.
pub struct DiagnosticRenderer {
    surface: Arc<dyn EditorSurface>,
    installed: bool,
    drawn: HashMap<DocumentKey, Vec<Drawn>>,
}

impl DiagnosticRenderer {
    pub fn new(surface: Arc<dyn EditorSurface>) -> Self {
        DiagnosticRenderer {
            surface,
            installed: false,
            drawn: HashMap::new(),
        }
    }

    fn publish(&self, key: &DocumentKey) -> Result<(), RenderError> {
        let items = self
            .drawn
            .get(key)
            .map(|drawn| drawn.iter().map(|d| d.annotation(d.inspection.message())).collect())
            .unwrap_or_default();
        self.surface.set_diagnostics(key, items)
    }

    fn wipe(&self, key: &DocumentKey) -> Result<(), RenderError> {
        self.surface.set_diagnostics(key, Vec::new())
    }
}

impl RendererStrategy for DiagnosticRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Diagnostics
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn install(&mut self) {
        if self.installed {
            return;
        }
        tracing::debug!("install diagnostics renderer");
        self.installed = true;
    }

    fn uninstall(&mut self) {
        if !self.installed {
            return;
        }
        tracing::debug!("uninstall diagnostics renderer");
        let keys: Vec<DocumentKey> = self.drawn.drain().map(|(key, _)| key).collect();
        for key in keys {
            if let Err(e) = self.wipe(&key) {
                tracing::debug!("diagnostics wipe of {} failed: {}", key, e);
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
            None => self.drawn.keys().cloned().collect(),
        };
        let mut result = Ok(());
        for key in keys {
            self.drawn.remove(&key);
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
        let fresh: Vec<Drawn> = inspections
            .iter()
            .map(|i| Drawn {
                range: i.hint_range(document),
                inspection: i.clone(),
            })
            .collect();
        let previous = self.drawn.remove(document.key()).unwrap_or_default();
        let merged = merge_leftover(fresh, &previous, |d| d.inspection.id.clone());
        self.drawn.insert(document.key().clone(), merged);
        self.publish(document.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemorySurface;

    const SOURCE: &str = "class Foo {\n    void run() {\n        go();\n    }\n}\n";

    fn setup() -> (Arc<MemorySurface>, DiagnosticRenderer, DocumentSnapshot) {
        let surface = Arc::new(MemorySurface::new());
        let mut renderer = DiagnosticRenderer::new(surface.clone());
        renderer.install();
        let doc = DocumentSnapshot::new("Foo.java", "java", 1, SOURCE);
        (surface, renderer, doc)
    }

    #[test]
    fn renders_message_at_hint_range() {
        let (surface, mut renderer, doc) = setup();
        let inspection = Inspection::new("Loop can be simplified", 2, "Use a stream");
        renderer.render_inspections(&doc, &[inspection]).unwrap();

        let items = surface.diagnostics_of(doc.key());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Loop can be simplified, maybe use a stream");
        assert_eq!(items[0].range.start.character, 8);
    }

    #[test]
    fn rerender_keeps_other_inspections() {
        let (surface, mut renderer, doc) = setup();
        let a = Inspection::new("a", 1, "s");
        let b = Inspection::new("b", 2, "t");
        renderer.render_inspections(&doc, &[a.clone(), b]).unwrap();
        renderer.render_inspections(&doc, &[a]).unwrap();
        assert_eq!(surface.diagnostics_of(doc.key()).len(), 2);
    }

    #[test]
    fn clear_then_render_drops_stale() {
        let (surface, mut renderer, doc) = setup();
        let a = Inspection::new("a", 1, "s");
        let b = Inspection::new("b", 2, "t");
        renderer.render_inspections(&doc, &[a.clone(), b]).unwrap();
        renderer.clear(Some(doc.key())).unwrap();
        renderer.render_inspections(&doc, &[a]).unwrap();
        assert_eq!(surface.diagnostics_of(doc.key()).len(), 1);
    }

    #[test]
    fn uninstalled_renderer_draws_nothing() {
        let (surface, mut renderer, doc) = setup();
        renderer.render_inspections(&doc, &[Inspection::new("a", 1, "s")]).unwrap();
        renderer.uninstall();
        assert!(surface.diagnostics_of(doc.key()).is_empty());

        let err = renderer
            .render_inspections(&doc, &[Inspection::new("a", 1, "s")])
            .unwrap_err();
        assert!(matches!(err, RenderError::NotInstalled { .. }));
        assert!(surface.diagnostics_of(doc.key()).is_empty());
    }
}
