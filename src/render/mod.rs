//! Renderer strategies.
//!
//! Each visual channel is a [`RendererStrategy`] that keeps its own per
//! document state and reconciles it against every new inspection list.
//! The [`RendererComposer`] owns the fixed set of strategies and installs
//! the subset enabled by configuration.
//!
//! Reconciliation rules per channel:
//!
//! | Channel          | Identity             | Module          |
//! |------------------|----------------------|-----------------|
//! | diagnostics      | inspection id        | `diagnostics`   |
//! | gutter icons     | trimmed solution     | `gutter`        |
//! | code lenses      | inspection id        | `code_lens`     |
//! | ruler highlights | trimmed solution     | `ruler`         |
//! | comments         | inspection id (diff) | `comment`       |

pub mod code_lens;
pub mod comment;
pub mod composer;
pub mod diagnostics;
pub mod gutter;
pub mod ruler;
pub mod surface;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tuginspect_core::error::RenderError;
use tuginspect_core::{DocumentKey, DocumentSnapshot, Inspection, Range};

pub use code_lens::CodeLensRenderer;
pub use comment::{CommentRenderer, COMMENT_AUTHOR, COMMENT_LABEL};
pub use composer::{RendererChange, RendererComposer};
pub use diagnostics::DiagnosticRenderer;
pub use gutter::GutterIconRenderer;
pub use ruler::RulerHighlightRenderer;
pub use surface::{
    Annotation, DocumentView, EditorSurface, InspectAction, MemorySurface, SurfaceSnapshot,
    ThreadHandle, ThreadSpec,
};

// ============================================================================
// Renderer kinds
// ============================================================================

/// The visual channels, named as in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Diagnostics,
    GutterIcons,
    CodeLenses,
    RulerHighlights,
    Comments,
}

impl RendererKind {
    /// Every kind, in composer order.
    pub const ALL: [RendererKind; 5] = [
        RendererKind::Diagnostics,
        RendererKind::GutterIcons,
        RendererKind::CodeLenses,
        RendererKind::RulerHighlights,
        RendererKind::Comments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RendererKind::Diagnostics => "diagnostics",
            RendererKind::GutterIcons => "guttericons",
            RendererKind::CodeLenses => "codelenses",
            RendererKind::RulerHighlights => "rulerhighlights",
            RendererKind::Comments => "comments",
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        RendererKind::ALL
            .into_iter()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| format!("unknown renderer '{}'", s))
    }
}

// ============================================================================
// Strategy contract
// ============================================================================

/// One visual channel.
///
/// Strategies are order independent and each draws only into its own
/// channel. While uninstalled a strategy draws nothing: `clear` is a no-op
/// and `render_inspections` returns [`RenderError::NotInstalled`].
pub trait RendererStrategy: Send {
    fn kind(&self) -> RendererKind;

    fn is_installed(&self) -> bool;

    /// Acquire drawing resources. Idempotent.
    fn install(&mut self);

    /// Drop all per-document state and wipe what was drawn. Idempotent.
    fn uninstall(&mut self);

    /// Forget what was drawn for one document, or for all of them.
    ///
    /// State is forgotten even when wiping the surface fails; the first
    /// failure is returned after every document was tried.
    fn clear(&mut self, document: Option<&DocumentKey>) -> Result<(), RenderError>;

    /// Reconcile the channel of `document` against `inspections`.
    fn render_inspections(
        &mut self,
        document: &DocumentSnapshot,
        inspections: &[Inspection],
    ) -> Result<(), RenderError>;
}

/// A drawn item and the inspection backing it.
#[derive(Debug, Clone)]
pub struct Drawn {
    pub inspection: Inspection,
    pub range: Range,
}

impl Drawn {
    pub fn annotation(&self, text: String) -> Annotation {
        Annotation {
            inspection: self.inspection.id.clone(),
            range: self.range,
            text,
        }
    }
}

/// `fresh` followed by every previous item whose key no fresh item has.
///
/// Items outside the scope of a partial re-render survive it; an item whose
/// key reappears is replaced by the fresh instance.
pub fn merge_leftover<K, F>(mut fresh: Vec<Drawn>, previous: &[Drawn], key: F) -> Vec<Drawn>
where
    K: PartialEq,
    F: Fn(&Drawn) -> K,
{
    let fresh_keys: Vec<K> = fresh.iter().map(&key).collect();
    fresh.extend(
        previous
            .iter()
            .filter(|old| !fresh_keys.contains(&key(*old)))
            .cloned(),
    );
    fresh
}

pub(crate) fn not_installed(kind: RendererKind) -> RenderError {
    RenderError::NotInstalled {
        kind: kind.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawn(line: u32, solution: &str) -> Drawn {
        Drawn {
            inspection: Inspection::new("d", line, solution),
            range: Range::lines(line, line),
        }
    }

    #[test]
    fn kind_names_parse_back() {
        for kind in RendererKind::ALL {
            assert_eq!(kind.name().parse::<RendererKind>(), Ok(kind));
        }
        assert_eq!("CodeLenses".parse::<RendererKind>(), Ok(RendererKind::CodeLenses));
        assert!("minimap".parse::<RendererKind>().is_err());
    }

    #[test]
    fn kind_serializes_as_config_name() {
        let json = serde_json::to_string(&RendererKind::RulerHighlights).unwrap();
        assert_eq!(json, "\"rulerhighlights\"");
    }

    #[test]
    fn merge_keeps_unsuperseded_leftovers() {
        let previous = vec![drawn(3, "fix X"), drawn(7, "fix Y")];
        let fresh = vec![drawn(4, " fix X ")];
        let merged = merge_leftover(fresh, &previous, |d| d.inspection.solution_key().to_string());

        let lines: Vec<u32> = merged.iter().map(|d| d.range.start.line).collect();
        assert_eq!(lines, [4, 7]);
    }

    #[test]
    fn merge_by_id_replaces_same_inspection() {
        let old = drawn(3, "fix X");
        let mut moved = old.clone();
        moved.range = Range::lines(9, 9);
        let merged = merge_leftover(vec![moved], &[old], |d| d.inspection.id.clone());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].range.start.line, 9);
    }
}
