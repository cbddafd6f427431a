//! Scripted replay of editor sessions.
//!
//! A replay script describes a set of documents with their symbol outlines,
//! canned inspector responses keyed by scope (`class Foo`, `range [3, 9]`),
//! and a list of editor steps. [`run_script`] drives an
//! [`InspectionSession`] over an in-memory surface and records one
//! [`ReplayFrame`] per step: what the surface shows, the cache statistics,
//! the notifications raised and how often the inspector was called.
//!
//! ```json
//! {
//!   "documents": [{
//!     "path": "src/Foo.java", "language": "java", "text": "class Foo {\n}\n",
//!     "symbols": [{ "name": "Foo", "kind": "class", "start": 0, "end": 1 }]
//!   }],
//!   "responses": {
//!     "class Foo": { "inspections": [{ "description": "...", "line": 0, "solution": "..." }] }
//!   },
//!   "steps": [
//!     { "op": "open", "path": "src/Foo.java" },
//!     { "op": "inspect-class", "path": "src/Foo.java", "class": "Foo" }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tuginspect_core::error::{InspectError, InspectResult};
use tuginspect_core::{
    CacheStats, DocumentKey, DocumentSnapshot, Inspection, InspectionCache, Range, StaticOutline,
    SymbolDescriptor, SymbolKind, SymbolOutline,
};

use crate::config::{InspectionConfig, RendererSettings};
use crate::inspector::{InspectTarget, InspectionService, Inspector};
use crate::notify::MemoryNotifier;
use crate::render::{MemorySurface, SurfaceSnapshot};
use crate::session::InspectionSession;

// ============================================================================
// Script format
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    pub documents: Vec<ScriptDocument>,
    #[serde(default)]
    pub responses: BTreeMap<String, ScriptResponse>,
    /// Renderer switches overriding the configured ones.
    #[serde(default)]
    pub renderer: Option<RendererSettings>,
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptDocument {
    pub path: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub text: String,
    #[serde(default)]
    pub symbols: Vec<ScriptSymbol>,
}

fn default_language() -> String {
    "java".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start: u32,
    pub end: u32,
}

impl ScriptSymbol {
    fn descriptor(&self) -> SymbolDescriptor {
        SymbolDescriptor::new(self.name.clone(), self.kind, Range::lines(self.start, self.end))
    }
}

/// Canned answer for one scope: inspections, or an error message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptResponse {
    #[serde(default)]
    pub inspections: Vec<ScriptInspection>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptInspection {
    pub description: String,
    pub line: u32,
    pub solution: String,
    #[serde(default)]
    pub indicator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ScriptStep {
    Open {
        path: String,
    },
    Change {
        path: String,
        text: String,
        /// Outline of the new text; the old outline is kept when absent.
        #[serde(default)]
        symbols: Option<Vec<ScriptSymbol>>,
    },
    Visible {
        paths: Vec<String>,
    },
    InspectClass {
        path: String,
        class: String,
    },
    InspectRange {
        path: String,
        start: u32,
        end: u32,
    },
    Ignore {
        path: String,
        description: String,
    },
    Settings {
        renderer: RendererSettings,
    },
}

impl ScriptStep {
    pub fn op(&self) -> &'static str {
        match self {
            ScriptStep::Open { .. } => "open",
            ScriptStep::Change { .. } => "change",
            ScriptStep::Visible { .. } => "visible",
            ScriptStep::InspectClass { .. } => "inspect-class",
            ScriptStep::InspectRange { .. } => "inspect-range",
            ScriptStep::Ignore { .. } => "ignore",
            ScriptStep::Settings { .. } => "settings",
        }
    }
}

impl ReplayScript {
    pub fn parse(content: &str) -> InspectResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| InspectError::script(format!("invalid replay script: {}", e)))
    }

    pub fn load(path: &Path) -> InspectResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

// ============================================================================
// Scripted inspector
// ============================================================================

/// Inspector answering from the script's canned responses.
///
/// Every call issues fresh inspection ids, like a real producer would.
pub struct ScriptedInspector {
    responses: BTreeMap<String, ScriptResponse>,
    calls: AtomicUsize,
}

impl ScriptedInspector {
    pub fn new(responses: BTreeMap<String, ScriptResponse>) -> Self {
        ScriptedInspector {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Inspector for ScriptedInspector {
    async fn inspect(
        &self,
        _document: &DocumentSnapshot,
        target: &InspectTarget,
    ) -> InspectResult<Vec<Inspection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scope = target.scope();
        let Some(response) = self.responses.get(&scope) else {
            return Err(InspectError::producer(scope, "no response"));
        };
        if let Some(error) = &response.error {
            return Err(InspectError::producer(scope, error.clone()));
        }
        Ok(response
            .inspections
            .iter()
            .map(|i| {
                let inspection = Inspection::new(i.description.clone(), i.line, i.solution.clone());
                match &i.indicator {
                    Some(indicator) => inspection.with_indicator(indicator.clone()),
                    None => inspection,
                }
            })
            .collect())
    }
}

// ============================================================================
// Runner
// ============================================================================

/// State after one step.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayFrame {
    pub step: usize,
    pub op: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub surface: SurfaceSnapshot,
    pub cache: CacheStats,
    pub notifications: Vec<String>,
    pub inspector_calls: usize,
}

struct Replay {
    session: InspectionSession,
    surface: Arc<MemorySurface>,
    notifier: Arc<MemoryNotifier>,
    inspector: Arc<ScriptedInspector>,
    outline: Arc<StaticOutline>,
    documents: HashMap<String, DocumentSnapshot>,
    visible: BTreeSet<DocumentKey>,
}

/// Run `script` and return one frame per step.
///
/// Malformed steps (unknown document, unknown class, nothing to ignore)
/// abort the run. Inspection failures do not: they are recorded in the
/// frame and the run continues.
pub async fn run_script(
    script: &ReplayScript,
    config: &InspectionConfig,
) -> InspectResult<Vec<ReplayFrame>> {
    let mut config = config.clone();
    if let Some(renderer) = &script.renderer {
        config.renderer = renderer.clone();
    }

    let outline = Arc::new(StaticOutline::new());
    let mut documents = HashMap::new();
    for doc in &script.documents {
        let snapshot =
            DocumentSnapshot::new(doc.path.as_str(), doc.language.clone(), 1, doc.text.clone());
        outline.set(
            snapshot.key().clone(),
            doc.symbols.iter().map(ScriptSymbol::descriptor).collect(),
        );
        if documents.insert(doc.path.clone(), snapshot).is_some() {
            return Err(InspectError::script(format!("duplicate document '{}'", doc.path)));
        }
    }

    let inspector = Arc::new(ScriptedInspector::new(script.responses.clone()));
    let surface = Arc::new(MemorySurface::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let service = InspectionService::new(
        Arc::new(InspectionCache::new()),
        outline.clone() as Arc<dyn SymbolOutline>,
        inspector.clone(),
    );
    let session = InspectionSession::new(&config, service, surface.clone(), notifier.clone());

    let mut replay = Replay {
        session,
        surface,
        notifier,
        inspector,
        outline,
        documents,
        visible: BTreeSet::new(),
    };

    let mut frames = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        tracing::debug!("replay step {}: {}", index, step.op());
        let outcome = replay.apply(step).await?;
        frames.push(replay.frame(index, step, outcome));
    }
    Ok(frames)
}

impl Replay {
    fn document(&self, path: &str) -> InspectResult<DocumentSnapshot> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| InspectError::DocumentNotFound {
                path: path.to_string(),
            })
    }

    fn show(&mut self, key: DocumentKey) {
        self.visible.insert(key);
        self.surface.set_visible(&self.visible);
    }

    /// Apply one step. The outer error aborts the run; the inner one is a
    /// command failure recorded in the frame.
    async fn apply(&mut self, step: &ScriptStep) -> InspectResult<Result<(), String>> {
        match step {
            ScriptStep::Open { path } => {
                let document = self.document(path)?;
                self.show(document.key().clone());
                self.session.document_opened(&document).await;
            }
            ScriptStep::Change {
                path,
                text,
                symbols,
            } => {
                let document = self.document(path)?.edited(text.clone());
                if let Some(symbols) = symbols {
                    self.outline.set(
                        document.key().clone(),
                        symbols.iter().map(ScriptSymbol::descriptor).collect(),
                    );
                }
                self.documents.insert(path.clone(), document.clone());
                self.session.document_changed(&document).await;
                self.session.flush().await;
            }
            ScriptStep::Visible { paths } => {
                let shown = paths
                    .iter()
                    .map(|p| self.document(p))
                    .collect::<InspectResult<Vec<_>>>()?;
                self.visible = shown.iter().map(|d| d.key().clone()).collect();
                self.surface.set_visible(&self.visible);
                self.session.visible_documents_changed(&shown).await;
            }
            ScriptStep::InspectClass { path, class } => {
                let document = self.document(path)?;
                let symbol = self
                    .outline
                    .find(document.key(), class)
                    .filter(|s| s.kind == SymbolKind::Class)
                    .ok_or_else(|| InspectError::SymbolNotFound {
                        name: class.clone(),
                        path: path.clone(),
                    })?;
                if let Err(e) = self.session.inspect_class(&document, &symbol).await {
                    return Ok(Err(e.to_string()));
                }
            }
            ScriptStep::InspectRange { path, start, end } => {
                let document = self.document(path)?;
                let range = Range::lines(*start, *end);
                if let Err(e) = self.session.inspect_range(&document, range).await {
                    return Ok(Err(e.to_string()));
                }
            }
            ScriptStep::Ignore { path, description } => {
                let document = self.document(path)?;
                let cached = self
                    .session
                    .cache()
                    .get_cached_inspections_of_doc(self.outline.as_ref(), &document)
                    .await;
                let inspection = cached
                    .into_iter()
                    .find(|i| i.problem.description == *description)
                    .ok_or_else(|| {
                        InspectError::script(format!(
                            "no cached inspection '{}' in {}",
                            description, path
                        ))
                    })?;
                self.session.ignore(&document, &inspection).await;
            }
            ScriptStep::Settings { renderer } => {
                self.session.reload_settings(renderer).await;
            }
        }
        Ok(Ok(()))
    }

    fn frame(&self, index: usize, step: &ScriptStep, outcome: Result<(), String>) -> ReplayFrame {
        ReplayFrame {
            step: index,
            op: step.op().to_string(),
            ok: outcome.is_ok(),
            error: outcome.err(),
            surface: self.surface.snapshot(),
            cache: self.session.cache().stats(),
            notifications: self.notifier.drain(),
            inspector_calls: self.inspector.calls(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "documents": [{
            "path": "src/Foo.java",
            "text": "class Foo {\n    void run() {\n        go();\n    }\n}\n",
            "symbols": [
                { "name": "Foo", "kind": "class", "start": 0, "end": 4 },
                { "name": "run", "kind": "method", "start": 1, "end": 3 }
            ]
        }],
        "responses": {
            "class Foo": {
                "inspections": [
                    { "description": "Plain call", "line": 2, "solution": "Use a method reference" }
                ]
            },
            "range [0, 0]": { "error": "context too short" }
        },
        "steps": [
            { "op": "open", "path": "src/Foo.java" },
            { "op": "inspect-range", "path": "src/Foo.java", "start": 0, "end": 0 },
            { "op": "inspect-class", "path": "src/Foo.java", "class": "Foo" },
            { "op": "inspect-class", "path": "src/Foo.java", "class": "Foo" }
        ]
    }"#;

    #[test]
    fn parse_reads_steps() {
        let script = ReplayScript::parse(SCRIPT).unwrap();
        assert_eq!(script.documents[0].language, "java");
        let ops: Vec<&str> = script.steps.iter().map(ScriptStep::op).collect();
        assert_eq!(ops, ["open", "inspect-range", "inspect-class", "inspect-class"]);
    }

    #[test]
    fn parse_rejects_unknown_op() {
        let err = ReplayScript::parse(r#"{"documents": [], "steps": [{"op": "close"}]}"#)
            .unwrap_err();
        assert!(matches!(err, InspectError::Script { .. }));
    }

    #[tokio::test]
    async fn frames_track_cache_and_calls() {
        let script = ReplayScript::parse(SCRIPT).unwrap();
        let frames = run_script(&script, &InspectionConfig::default()).await.unwrap();
        assert_eq!(frames.len(), 4);

        assert_eq!(frames[0].inspector_calls, 0);
        assert_eq!(frames[0].surface.documents["src/Foo.java"].actions.len(), 1);

        assert!(!frames[1].ok);
        assert_eq!(
            frames[1].error.as_deref(),
            Some("failed to inspect range [0, 0]: context too short")
        );
        assert_eq!(
            frames[1].notifications,
            ["Failed to inspect range [0, 0]: context too short"]
        );
        assert_eq!(frames[1].cache.failed, 1);

        assert!(frames[2].ok);
        assert_eq!(frames[2].inspector_calls, 2);
        assert_eq!(frames[2].cache.ready, 2);
        assert_eq!(frames[2].cache.failed, 0);
        assert_eq!(
            frames[2].surface.documents["src/Foo.java"].diagnostics,
            [(2, "Plain call, maybe use a method reference".to_string())]
        );
        assert!(frames[2].notifications.is_empty());

        assert_eq!(frames[3].inspector_calls, 2);
    }

    #[tokio::test]
    async fn unknown_document_aborts() {
        let script = ReplayScript::parse(
            r#"{"documents": [], "steps": [{"op": "open", "path": "Missing.java"}]}"#,
        )
        .unwrap();
        let err = run_script(&script, &InspectionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InspectError::DocumentNotFound { .. }));
    }
}
