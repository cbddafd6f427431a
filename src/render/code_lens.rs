//! Code lens channel: a clickable fix lens above each problem line.

use std::collections::HashMap;
use std::sync::Arc;

use tuginspect_core::error::RenderError;
use tuginspect_core::{DocumentKey, DocumentSnapshot, Inspection, Position, Range};

use super::surface::EditorSurface;
use super::{merge_leftover, not_installed, Drawn, RendererKind, RendererStrategy};

/// Code lenses keyed by inspection id.
pub struct CodeLensRenderer {
    surface: Arc<dyn EditorSurface>,
    installed: bool,
    drawn: HashMap<DocumentKey, Vec<Drawn>>,
}

impl CodeLensRenderer {
    pub fn new(surface: Arc<dyn EditorSurface>) -> Self {
        CodeLensRenderer {
            surface,
            installed: false,
            drawn: HashMap::new(),
        }
    }

    /// Lens title for an inspection.
    pub fn title(inspection: &Inspection) -> String {
        inspection.message()
    }

    fn wipe(&self, key: &DocumentKey) -> Result<(), RenderError> {
        self.surface.set_code_lenses(key, Vec::new())
    }
}

impl RendererStrategy for CodeLensRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::CodeLenses
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn install(&mut self) {
        if self.installed {
            return;
        }
        tracing::debug!("install code lens renderer");
        self.installed = true;
    }

    fn uninstall(&mut self) {
        if !self.installed {
            return;
        }
        tracing::debug!("uninstall code lens renderer");
        let keys: Vec<DocumentKey> = self.drawn.drain().map(|(key, _)| key).collect();
        for key in keys {
            if let Err(e) = self.wipe(&key) {
                tracing::debug!("code lens wipe of {} failed: {}", key, e);
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
            .map(|i| {
                let hint = i.hint_range(document);
                Drawn {
                    range: Range::new(Position::new(hint.start.line, 0), hint.start),
                    inspection: i.clone(),
                }
            })
            .collect();
        let previous = self.drawn.remove(document.key()).unwrap_or_default();
        let merged = merge_leftover(fresh, &previous, |d| d.inspection.id.clone());
        let items = merged
            .iter()
            .map(|d| d.annotation(Self::title(&d.inspection)))
            .collect();
        self.drawn.insert(document.key().clone(), merged);
        self.surface.set_code_lenses(document.key(), items)
    }
}
