//! Composition of renderer strategies.
//!
//! The composer owns one strategy per [`RendererKind`] and the enabled
//! subset chosen by [`RendererSettings`]. Reconfiguring diffs the desired
//! subset against the enabled one: strategies entering the subset are
//! installed, strategies leaving it are uninstalled, the rest are left
//! alone. `clear` and `render_inspections` fan out to every enabled
//! strategy; a failing strategy is logged and skipped so it never blocks
//! the others.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use tuginspect_core::error::RenderError;
use tuginspect_core::{DocumentKey, DocumentSnapshot, Inspection};

use crate::config::RendererSettings;

use super::surface::EditorSurface;
use super::{
    CodeLensRenderer, CommentRenderer, DiagnosticRenderer, GutterIconRenderer, RendererKind,
    RendererStrategy, RulerHighlightRenderer,
};

/// Strategies installed and uninstalled by one reconfiguration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RendererChange {
    pub installed: Vec<RendererKind>,
    pub uninstalled: Vec<RendererKind>,
}

impl RendererChange {
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty() && self.uninstalled.is_empty()
    }
}

pub struct RendererComposer {
    strategies: Vec<Box<dyn RendererStrategy>>,
    enabled: BTreeSet<RendererKind>,
}

impl RendererComposer {
    /// Compose `strategies` and install the subset `settings` enables.
    pub fn new(strategies: Vec<Box<dyn RendererStrategy>>, settings: &RendererSettings) -> Self {
        let mut composer = RendererComposer {
            strategies,
            enabled: BTreeSet::new(),
        };
        composer.reconfigure(settings);
        composer
    }

    /// The fixed five-channel composition over `surface`.
    pub fn with_defaults(surface: Arc<dyn EditorSurface>, settings: &RendererSettings) -> Self {
        let strategies: Vec<Box<dyn RendererStrategy>> = vec![
            Box::new(DiagnosticRenderer::new(Arc::clone(&surface))),
            Box::new(GutterIconRenderer::new(Arc::clone(&surface))),
            Box::new(CodeLensRenderer::new(Arc::clone(&surface))),
            Box::new(RulerHighlightRenderer::new(Arc::clone(&surface))),
            Box::new(CommentRenderer::new(surface)),
        ];
        Self::new(strategies, settings)
    }

    /// Enabled kinds in composer order.
    pub fn enabled(&self) -> Vec<RendererKind> {
        self.enabled.iter().copied().collect()
    }

    /// Move to the subset `settings` enables.
    pub fn reconfigure(&mut self, settings: &RendererSettings) -> RendererChange {
        let desired: BTreeSet<RendererKind> = settings
            .enabled_kinds()
            .into_iter()
            .filter(|kind| self.strategies.iter().any(|s| s.kind() == *kind))
            .collect();

        let mut change = RendererChange::default();
        for strategy in &mut self.strategies {
            let kind = strategy.kind();
            match (self.enabled.contains(&kind), desired.contains(&kind)) {
                (false, true) => {
                    strategy.install();
                    change.installed.push(kind);
                }
                (true, false) => {
                    strategy.uninstall();
                    change.uninstalled.push(kind);
                }
                _ => {}
            }
        }
        self.enabled = desired;

        if !change.is_empty() {
            tracing::debug!(
                "renderers reconfigured: installed {:?}, uninstalled {:?}",
                change.installed,
                change.uninstalled
            );
        }
        change
    }

    fn enabled_strategies(&mut self) -> impl Iterator<Item = &mut Box<dyn RendererStrategy>> {
        let enabled = &self.enabled;
        self.strategies
            .iter_mut()
            .filter(move |s| enabled.contains(&s.kind()))
    }

    /// Install every enabled strategy.
    pub fn install(&mut self) {
        for strategy in self.enabled_strategies() {
            strategy.install();
        }
    }

    /// Uninstall every enabled strategy. The enabled subset is kept, so a
    /// later `install` restores it.
    pub fn uninstall(&mut self) {
        for strategy in self.enabled_strategies() {
            strategy.uninstall();
        }
    }

    /// Clear every enabled strategy. Returns the failures, which are
    /// already logged.
    pub fn clear(&mut self, document: Option<&DocumentKey>) -> Vec<(RendererKind, RenderError)> {
        let mut failures = Vec::new();
        for strategy in self.enabled_strategies() {
            if let Err(e) = strategy.clear(document) {
                tracing::warn!("{} renderer failed to clear: {}", strategy.kind(), e);
                failures.push((strategy.kind(), e));
            }
        }
        failures
    }

    /// Render into every enabled strategy. Returns the failures, which are
    /// already logged.
    pub fn render_inspections(
        &mut self,
        document: &DocumentSnapshot,
        inspections: &[Inspection],
    ) -> Vec<(RendererKind, RenderError)> {
        let mut failures = Vec::new();
        for strategy in self.enabled_strategies() {
            if let Err(e) = strategy.render_inspections(document, inspections) {
                tracing::warn!(
                    "{} renderer failed for {}: {}",
                    strategy.kind(),
                    document.key(),
                    e
                );
                failures.push((strategy.kind(), e));
            }
        }
        failures
    }

    /// Clear `document` and draw `inspections` in its place.
    pub fn redraw(
        &mut self,
        document: &DocumentSnapshot,
        inspections: &[Inspection],
    ) -> Vec<(RendererKind, RenderError)> {
        tracing::debug!("redraw {} ({} inspections)", document.key(), inspections.len());
        let mut failures = self.clear(Some(document.key()));
        failures.extend(self.render_inspections(document, inspections));
        failures
    }
}
