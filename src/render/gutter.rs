//! Gutter icon channel.
//!
//! Icons are keyed by trimmed solution text, like ruler highlights: an icon
//! is superseded only by a fresh one suggesting the same rewrite.

use std::collections::HashMap;
use std::sync::Arc;

use tuginspect_core::error::RenderError;
use tuginspect_core::{DocumentKey, DocumentSnapshot, Inspection};

use super::surface::EditorSurface;
use super::{merge_leftover, not_installed, Drawn, RendererKind, RendererStrategy};

pub struct GutterIconRenderer {
    surface: Arc<dyn EditorSurface>,
    installed: bool,
    drawn: HashMap<DocumentKey, Vec<Drawn>>,
}

impl GutterIconRenderer {
    pub fn new(surface: Arc<dyn EditorSurface>) -> Self {
        GutterIconRenderer {
            surface,
            installed: false,
            drawn: HashMap::new(),
        }
    }

    fn wipe(&self, key: &DocumentKey) -> Result<(), RenderError> {
        self.surface.set_gutter_icons(key, Vec::new())
    }
}

impl RendererStrategy for GutterIconRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::GutterIcons
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn install(&mut self) {
        if self.installed {
            return;
        }
        tracing::debug!("install gutter icon renderer");
        self.installed = true;
    }

    fn uninstall(&mut self) {
        if !self.installed {
            return;
        }
        tracing::debug!("uninstall gutter icon renderer");
        let keys: Vec<DocumentKey> = self.drawn.drain().map(|(key, _)| key).collect();
        for key in keys {
            if let Err(e) = self.wipe(&key) {
                tracing::debug!("gutter icon wipe of {} failed: {}", key, e);
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
        let merged = merge_leftover(fresh, &previous, |d| {
            d.inspection.solution_key().to_string()
        });
        let items = merged
            .iter()
            .map(|d| d.annotation(d.inspection.message()))
            .collect();
        self.drawn.insert(document.key().clone(), merged);
        self.surface.set_gutter_icons(document.key(), items)
    }
}
