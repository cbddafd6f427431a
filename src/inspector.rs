//! Inspection service: the cache in front of the inspection producer.
//!
//! The producer (a language model behind some transport) is an
//! [`Inspector`]. [`InspectionService::inspect`] serves every symbol of the
//! requested scope it can from the cache and calls the inspector at most
//! once for the rest. While that call runs its result is registered as
//! pending for the missing symbols, so a concurrent request for any of them
//! waits on the same call instead of starting another.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use tuginspect_core::error::{InspectError, InspectResult};
use tuginspect_core::{
    classes_and_methods, uncapitalize, BatchOutcome, DocumentSnapshot, Inspection, InspectionCache,
    PendingInspections, Range, SymbolDescriptor, SymbolOutline,
};

/// What to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectTarget {
    /// A class or method, with every symbol nested in it.
    Symbol(SymbolDescriptor),
    /// An arbitrary line range, with every symbol it touches.
    Range(Range),
}

impl InspectTarget {
    /// Human-readable scope for messages: `class Foo` or `range [3, 9]`.
    pub fn scope(&self) -> String {
        match self {
            InspectTarget::Symbol(symbol) => symbol.to_string(),
            InspectTarget::Range(range) => format!("range {}", range),
        }
    }

    /// Whether `symbol` falls in this target's scope.
    pub fn covers(&self, symbol: &SymbolDescriptor) -> bool {
        match self {
            InspectTarget::Symbol(target) => target.range.contains_range(&symbol.range),
            InspectTarget::Range(range) => range.intersects(&symbol.range),
        }
    }
}

/// Producer of inspections for a document scope.
#[async_trait]
pub trait Inspector: Send + Sync {
    /// Inspect `target` of `document`. Lines of the returned inspections are
    /// absolute.
    async fn inspect(
        &self,
        document: &DocumentSnapshot,
        target: &InspectTarget,
    ) -> InspectResult<Vec<Inspection>>;
}

/// Chat request asking for an inspection to be fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixRequest {
    pub message: String,
    pub range: Range,
}

/// Build the fix request for `inspection`.
pub fn fix_request(inspection: &Inspection, document: &DocumentSnapshot) -> FixRequest {
    FixRequest {
        message: format!(
            "/fix {}, maybe {}",
            inspection.problem.description,
            uncapitalize(&inspection.solution)
        ),
        range: inspection.hint_range(document),
    }
}

pub struct InspectionService {
    cache: Arc<InspectionCache>,
    outline: Arc<dyn SymbolOutline>,
    inspector: Arc<dyn Inspector>,
}

impl InspectionService {
    pub fn new(
        cache: Arc<InspectionCache>,
        outline: Arc<dyn SymbolOutline>,
        inspector: Arc<dyn Inspector>,
    ) -> Self {
        InspectionService {
            cache,
            outline,
            inspector,
        }
    }

    pub fn cache(&self) -> &Arc<InspectionCache> {
        &self.cache
    }

    pub fn outline(&self) -> &dyn SymbolOutline {
        self.outline.as_ref()
    }

    /// Inspections for `target`, from cache where possible.
    ///
    /// Returns the cached inspections of every scoped symbol that hit plus
    /// the freshly produced inspections not owned by one of those symbols.
    pub async fn inspect(
        &self,
        document: &DocumentSnapshot,
        target: &InspectTarget,
    ) -> InspectResult<Vec<Inspection>> {
        let scoped: Vec<SymbolDescriptor> = classes_and_methods(self.outline.as_ref(), document)
            .await
            .into_iter()
            .filter(|s| target.covers(s))
            .collect();

        let mut hits: Vec<SymbolDescriptor> = Vec::new();
        let mut missing: Vec<SymbolDescriptor> = Vec::new();
        let mut inspections: Vec<Inspection> = Vec::new();
        for symbol in scoped {
            let cached = if self.cache.has_cache(document, Some(&symbol)) {
                self.cache
                    .get_cached_inspections_of_symbol(document, &symbol)
                    .await
            } else {
                None
            };
            match cached {
                Some(list) => {
                    inspections.extend(list);
                    hits.push(symbol);
                }
                None => missing.push(symbol),
            }
        }

        if missing.is_empty() && !hits.is_empty() {
            tracing::debug!("{} served from cache", target.scope());
            return Ok(inspections);
        }

        tracing::info!(
            "inspecting {} of {} ({} cached, {} to inspect)",
            target.scope(),
            document.key(),
            hits.len(),
            missing.len()
        );
        let pending = self.start(document, target);
        let batch = self.cache.begin(document, &missing, pending.clone());
        let outcome = pending.wait().await;
        self.cache.settle(document.key(), batch, &outcome);

        let produced = outcome.map_err(|message| InspectError::producer(target.scope(), message))?;
        inspections.extend(
            produced
                .iter()
                .filter(|i| !hits.iter().any(|s| s.owns_line(i.line())))
                .map(|i| {
                    let mut fresh = i.clone();
                    fresh.document = Some(document.reference());
                    fresh.symbol = missing.iter().find(|s| s.owns_line(i.line())).cloned();
                    if let Some(symbol) = &fresh.symbol {
                        fresh.problem.position.relative_line =
                            i.line().saturating_sub(symbol.range.start.line);
                    }
                    fresh
                }),
        );
        Ok(inspections)
    }

    /// Start the inspector call as a shared deferred batch.
    fn start(&self, document: &DocumentSnapshot, target: &InspectTarget) -> PendingInspections {
        let inspector = Arc::clone(&self.inspector);
        let document = document.clone();
        let target = target.clone();
        PendingInspections::new(async move {
            batch_outcome(inspector.inspect(&document, &target).await)
        })
    }
}

/// Shareable form of an inspector result. A producer error keeps only its
/// message; the scope is added back when the error is reported.
fn batch_outcome(result: InspectResult<Vec<Inspection>>) -> BatchOutcome {
    match result {
        Ok(list) => Ok(list.into()),
        Err(InspectError::Producer { message, .. }) => Err(message),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tuginspect_core::{DocumentKey, StaticOutline, SymbolKind};

    /// Inspector returning a fixed list, optionally held until released.
    struct FixedInspector {
        result: Result<Vec<Inspection>, String>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl FixedInspector {
        fn ok(list: Vec<Inspection>) -> Self {
            FixedInspector {
                result: Ok(list),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn failing(message: &str) -> Self {
            FixedInspector {
                result: Err(message.to_string()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl Inspector for FixedInspector {
        async fn inspect(
            &self,
            _document: &DocumentSnapshot,
            target: &InspectTarget,
        ) -> InspectResult<Vec<Inspection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            // Every call produces fresh ids, like a real producer.
            match &self.result {
                Ok(list) => Ok(list
                    .iter()
                    .map(|i| Inspection::new(i.problem.description.clone(), i.line(), i.solution.clone()))
                    .collect()),
                Err(message) => Err(InspectError::producer(target.scope(), message.clone())),
            }
        }
    }

    const SOURCE: &str = "\
class Foo {
    int count;

    void run() {
        for (int i = 0; i < 10; i++) {
            go(i);
        }
    }

    void stop() {
        halt();
    }
}
";

    fn fixture() -> (DocumentSnapshot, Arc<StaticOutline>, SymbolDescriptor) {
        let document = DocumentSnapshot::new("src/Foo.java", "java", 1, SOURCE);
        let class = SymbolDescriptor::new("Foo", SymbolKind::Class, Range::lines(0, 12));
        let outline = Arc::new(StaticOutline::new());
        outline.set(
            document.key().clone(),
            vec![
                class.clone(),
                SymbolDescriptor::new("run", SymbolKind::Method, Range::lines(3, 7)),
                SymbolDescriptor::new("stop", SymbolKind::Method, Range::lines(9, 11)),
            ],
        );
        (document, outline, class)
    }

    fn service(outline: Arc<StaticOutline>, inspector: Arc<FixedInspector>) -> InspectionService {
        InspectionService::new(Arc::new(InspectionCache::new()), outline, inspector)
    }

    mod scoping {
        use super::*;

        #[test]
        fn scope_names_target() {
            let class = SymbolDescriptor::new("Foo", SymbolKind::Class, Range::lines(0, 12));
            assert_eq!(InspectTarget::Symbol(class).scope(), "class Foo");
            assert_eq!(InspectTarget::Range(Range::lines(3, 9)).scope(), "range [3, 9]");
        }

        #[test]
        fn range_covers_intersecting_symbols() {
            let target = InspectTarget::Range(Range::lines(5, 6));
            let run = SymbolDescriptor::new("run", SymbolKind::Method, Range::lines(3, 7));
            let stop = SymbolDescriptor::new("stop", SymbolKind::Method, Range::lines(9, 11));
            assert!(target.covers(&run));
            assert!(!target.covers(&stop));
        }

        #[test]
        fn fix_request_message() {
            let document = DocumentSnapshot::new("Foo.java", "java", 1, SOURCE);
            let inspection = Inspection::new("Loop can be a stream", 4, "Use IntStream.range");
            let request = fix_request(&inspection, &document);
            assert_eq!(request.message, "/fix Loop can be a stream, maybe use IntStream.range");
            assert_eq!(request.range.start.line, 4);
            assert_eq!(request.range.start.character, 8);
        }
    }

    mod caching {
        use super::*;

        #[tokio::test]
        async fn second_inspection_is_served_from_cache() {
            let (document, outline, class) = fixture();
            let inspector = Arc::new(FixedInspector::ok(vec![
                Inspection::new("loop", 4, "use a stream"),
                Inspection::new("class", 0, "make it final"),
            ]));
            let service = service(outline, inspector.clone());
            let target = InspectTarget::Symbol(class);

            let first = service.inspect(&document, &target).await.unwrap();
            assert_eq!(first.len(), 2);
            assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);

            let second = service.inspect(&document, &target).await.unwrap();
            assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);
            let mut ids_first: Vec<_> = first.iter().map(|i| i.id.clone()).collect();
            let mut ids_second: Vec<_> = second.iter().map(|i| i.id.clone()).collect();
            ids_first.sort();
            ids_second.sort();
            assert_eq!(ids_first, ids_second);
        }

        #[tokio::test]
        async fn clean_symbols_are_not_reinspected() {
            let (document, outline, class) = fixture();
            let inspector = Arc::new(FixedInspector::ok(vec![Inspection::new(
                "loop",
                4,
                "use a stream",
            )]));
            let service = service(outline, inspector.clone());
            let target = InspectTarget::Symbol(class);

            service.inspect(&document, &target).await.unwrap();
            service.inspect(&document, &target).await.unwrap();
            assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);
            assert_eq!(service.cache().stats().ready, 3);
        }

        #[tokio::test]
        async fn edited_method_alone_is_reinspected() {
            let (document, outline, class) = fixture();
            let inspector = Arc::new(FixedInspector::ok(vec![
                Inspection::new("loop", 4, "use a stream"),
                Inspection::new("halt", 10, "inline halt"),
            ]));
            let service = service(outline, inspector.clone());
            service
                .inspect(&document, &InspectTarget::Symbol(class.clone()))
                .await
                .unwrap();

            let edited = document.edited(SOURCE.replace("halt();", "halt(true);"));
            let result = service
                .inspect(&edited, &InspectTarget::Symbol(class))
                .await
                .unwrap();
            assert_eq!(inspector.calls.load(Ordering::SeqCst), 2);
            let loops = result.iter().filter(|i| i.problem.description == "loop").count();
            assert_eq!(loops, 1);
        }

        #[tokio::test]
        async fn concurrent_requests_share_one_call() {
            let (document, outline, class) = fixture();
            let gate = Arc::new(Notify::new());
            let inspector = Arc::new(FixedInspector {
                result: Ok(vec![Inspection::new("loop", 4, "use a stream")]),
                calls: AtomicUsize::new(0),
                gate: Some(gate.clone()),
            });
            let service = Arc::new(service(outline, inspector.clone()));
            let target = InspectTarget::Symbol(class);

            let first = {
                let (service, document, target) = (service.clone(), document.clone(), target.clone());
                tokio::spawn(async move { service.inspect(&document, &target).await })
            };
            while inspector.calls.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            let second = {
                let (service, document, target) = (service.clone(), document.clone(), target.clone());
                tokio::spawn(async move { service.inspect(&document, &target).await })
            };
            tokio::task::yield_now().await;
            gate.notify_one();

            let a = first.await.unwrap().unwrap();
            let b = second.await.unwrap().unwrap();
            assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);
            assert_eq!(a[0].id, b[0].id);
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn failure_names_scope_and_is_not_cached() {
            let (document, outline, class) = fixture();
            let inspector = Arc::new(FixedInspector::failing("model unavailable"));
            let service = service(outline, inspector.clone());

            let err = service
                .inspect(&document, &InspectTarget::Symbol(class.clone()))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "failed to inspect class Foo: model unavailable");
            assert!(!service.cache().has_cache(&document, Some(&class)));
            assert_eq!(service.cache().stats().failed, 3);

            let _ = service
                .inspect(&document, &InspectTarget::Symbol(class))
                .await;
            assert_eq!(inspector.calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn unknown_document_inspects_with_no_symbols() {
            let (_, outline, _) = fixture();
            let inspector = Arc::new(FixedInspector::ok(vec![Inspection::new("x", 1, "y")]));
            let service = service(outline, inspector.clone());
            let other = DocumentSnapshot::new(DocumentKey::new("Other.java"), "java", 1, "x\ny\n");

            let result = service
                .inspect(&other, &InspectTarget::Range(Range::lines(0, 1)))
                .await
                .unwrap();
            assert_eq!(result.len(), 1);
            assert!(result[0].symbol.is_none());
            assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);
        }
    }
}
