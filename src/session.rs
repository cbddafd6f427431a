//! Editor event handling.
//!
//! An [`InspectionSession`] reacts to editor events and user commands:
//!
//! - document opened or shown: re-render cached inspections and rebuild the
//!   inspect-action lenses at once
//! - document changed: clear and re-render cached inspections at once, then
//!   rebuild the inspect-action lenses once edits settle (per-document
//!   debounce)
//! - inspect class / inspect range: run the inspection service and render
//!   the result, or tell the user what failed
//! - ignore: drop one inspection from the cache and re-render
//!
//! Documents in languages outside the configured list are ignored.
//!
//! The renderer composer sits behind a `tokio::sync::Mutex`, so render
//! state is mutated by one task at a time however events arrive.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use tuginspect_core::error::{InspectError, InspectResult};
use tuginspect_core::{
    classes_and_methods, DocumentSnapshot, Inspection, InspectionCache, Range,
    SymbolDescriptor, SymbolKind,
};

use crate::config::{InspectionConfig, RendererSettings};
use crate::debounce::Debouncer;
use crate::inspector::{InspectTarget, InspectionService};
use crate::notify::Notifier;
use crate::render::{EditorSurface, InspectAction, RendererChange, RendererComposer, RendererKind};

/// Title of the lens offered above every class.
pub const INSPECT_ACTION_TITLE: &str = "Rewrite with new syntax";

struct SessionInner {
    service: InspectionService,
    composer: Mutex<RendererComposer>,
    surface: Arc<dyn EditorSurface>,
    notifier: Arc<dyn Notifier>,
    config: InspectionConfig,
    debouncer: Debouncer,
}

/// Cloneable handle to one editor session.
#[derive(Clone)]
pub struct InspectionSession {
    inner: Arc<SessionInner>,
}

impl InspectionSession {
    /// Build a session rendering through the default strategy set.
    pub fn new(
        config: &InspectionConfig,
        service: InspectionService,
        surface: Arc<dyn EditorSurface>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let composer = RendererComposer::with_defaults(Arc::clone(&surface), &config.renderer);
        Self::with_composer(config, service, composer, surface, notifier)
    }

    pub fn with_composer(
        config: &InspectionConfig,
        service: InspectionService,
        composer: RendererComposer,
        surface: Arc<dyn EditorSurface>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        InspectionSession {
            inner: Arc::new(SessionInner {
                service,
                composer: Mutex::new(composer),
                surface,
                notifier,
                config: config.clone(),
                debouncer: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<InspectionCache> {
        self.inner.service.cache()
    }

    pub fn service(&self) -> &InspectionService {
        &self.inner.service
    }

    /// Kinds currently enabled.
    pub async fn renderers(&self) -> Vec<RendererKind> {
        self.inner.composer.lock().await.enabled()
    }

    fn accepts(&self, document: &DocumentSnapshot) -> bool {
        self.inner.config.accepts(document.language_id())
    }

    // ------------------------------------------------------------------------
    // Editor events
    // ------------------------------------------------------------------------

    pub async fn document_opened(&self, document: &DocumentSnapshot) {
        if !self.accepts(document) {
            return;
        }
        self.rerender(document).await;
        self.rebuild_inspect_actions(document).await;
    }

    pub async fn visible_documents_changed(&self, documents: &[DocumentSnapshot]) {
        for document in documents {
            self.document_opened(document).await;
        }
    }

    pub async fn document_changed(&self, document: &DocumentSnapshot) {
        if !self.accepts(document) {
            return;
        }
        self.rerender(document).await;

        let session = self.clone();
        let latest = document.clone();
        self.inner.debouncer.schedule(document.key().clone(), async move {
            session.rebuild_inspect_actions(&latest).await;
        });
    }

    /// Wait for debounced work scheduled so far.
    pub async fn flush(&self) {
        self.inner.debouncer.flush().await;
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub async fn inspect_class(
        &self,
        document: &DocumentSnapshot,
        class: &SymbolDescriptor,
    ) -> InspectResult<Vec<Inspection>> {
        self.inspect(document, InspectTarget::Symbol(class.clone())).await
    }

    pub async fn inspect_range(
        &self,
        document: &DocumentSnapshot,
        range: Range,
    ) -> InspectResult<Vec<Inspection>> {
        self.inspect(document, InspectTarget::Range(range)).await
    }

    async fn inspect(
        &self,
        document: &DocumentSnapshot,
        target: InspectTarget,
    ) -> InspectResult<Vec<Inspection>> {
        if !self.accepts(document) {
            return Err(InspectError::invalid_args(format!(
                "language '{}' is not inspected",
                document.language_id()
            )));
        }
        match self.inner.service.inspect(document, &target).await {
            Ok(inspections) => {
                let mut composer = self.inner.composer.lock().await;
                composer.render_inspections(document, &inspections);
                Ok(inspections)
            }
            Err(e) => {
                let reason = match &e {
                    InspectError::Producer { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                tracing::error!(
                    "failed to inspect {} of {}: {}",
                    target.scope(),
                    document.key(),
                    reason
                );
                self.inner
                    .notifier
                    .error(&format!("Failed to inspect {}: {}", target.scope(), reason));
                Err(e)
            }
        }
    }

    /// Drop `inspection` from the cache and re-render the document.
    pub async fn ignore(&self, document: &DocumentSnapshot, inspection: &Inspection) -> bool {
        let removed = self.cache().invalidate_inspection_cache(
            document.key(),
            inspection.symbol.as_ref(),
            Some(inspection),
        );
        self.rerender(document).await;
        removed
    }

    pub async fn reload_settings(&self, settings: &RendererSettings) -> RendererChange {
        self.inner.composer.lock().await.reconfigure(settings)
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Redraw `document` from the cache.
    ///
    /// Pending batches are awaited before the composer is locked.
    async fn rerender(&self, document: &DocumentSnapshot) {
        let inspections = self
            .cache()
            .get_cached_inspections_of_doc(self.inner.service.outline(), document)
            .await;
        self.inner
            .composer
            .lock()
            .await
            .redraw(document, &inspections);
    }

    /// Offer an inspect action above every class of the document.
    pub async fn rebuild_inspect_actions(&self, document: &DocumentSnapshot) {
        let actions: Vec<InspectAction> =
            classes_and_methods(self.inner.service.outline(), document)
                .await
                .into_iter()
                .filter(|s| s.kind == SymbolKind::Class)
                .map(|class| InspectAction {
                    range: Range::new(class.range.start, class.range.start),
                    title: INSPECT_ACTION_TITLE.to_string(),
                    symbol: class.name,
                })
                .collect();
        self.inner.surface.set_inspect_actions(document.key(), actions);
    }
}
