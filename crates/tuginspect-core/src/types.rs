//! Inspection and symbol data model.
//!
//! ## Coordinate Conventions
//!
//! - Lines and characters are **0-indexed** (LSP/editor API convention)
//! - Ranges are inclusive of both start and end line
//! - Characters count Unicode scalar values, not bytes

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text::DocumentSnapshot;

// ============================================================================
// Positions and Ranges
// ============================================================================

/// A position in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-indexed).
    pub line: u32,
    /// Character offset within the line (0-indexed).
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }
}

/// A span between two positions, end exclusive on the character axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }

    /// Range covering whole lines `start..=end`; the end character is clamped
    /// by the document when text is extracted.
    pub fn lines(start: u32, end: u32) -> Self {
        Range {
            start: Position::new(start, 0),
            end: Position::new(end, u32::MAX),
        }
    }

    /// True when `line` is within `[start.line, end.line]`.
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start.line && line <= self.end.line
    }

    /// True when `other` lies entirely within this range (line granularity).
    pub fn contains_range(&self, other: &Range) -> bool {
        self.contains_line(other.start.line) && self.contains_line(other.end.line)
    }

    /// True when the two ranges share at least one line.
    pub fn intersects(&self, other: &Range) -> bool {
        self.start.line <= other.end.line && other.start.line <= self.end.line
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.line, self.end.line)
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Stable filesystem identity of a document.
///
/// Cache entries and rendered state are keyed by this, never by the editor's
/// version counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentKey(pub PathBuf);

impl DocumentKey {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DocumentKey(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Back-reference from an inspection to the document snapshot it was last
/// replayed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub key: DocumentKey,
    pub version: i32,
}

// ============================================================================
// Symbols
// ============================================================================

/// Kind of an outline symbol that can own inspections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Method,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Class => write!(f, "class"),
            SymbolKind::Method => write!(f, "method"),
        }
    }
}

/// A class or method declaration and its current span.
///
/// `name` is the cache key within a document. Overloaded or duplicate names
/// share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolDescriptor {
    pub name: String,
    pub kind: SymbolKind,
    pub range: Range,
}

impl SymbolDescriptor {
    pub fn new(name: impl Into<String>, kind: SymbolKind, range: Range) -> Self {
        SymbolDescriptor {
            name: name.into(),
            kind,
            range,
        }
    }

    /// Whether an inspection anchored at `line` belongs to this symbol.
    ///
    /// Methods own every line of their span. Classes own only their
    /// declaration line so that a nested method's inspection is never
    /// claimed twice.
    pub fn owns_line(&self, line: u32) -> bool {
        match self.kind {
            SymbolKind::Method => self.range.contains_line(line),
            SymbolKind::Class => line == self.range.start.line,
        }
    }
}

impl fmt::Display for SymbolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

// ============================================================================
// Inspections
// ============================================================================

/// Stable identifier of an inspection. Never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InspectionId(pub String);

impl InspectionId {
    /// Issue a fresh identifier.
    pub fn generate() -> Self {
        InspectionId(format!("insp_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InspectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a problem sits: absolute line plus the offset from the owning
/// symbol's first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProblemPosition {
    pub line: u32,
    #[serde(default)]
    pub relative_line: u32,
}

/// A detected issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub description: String,
    pub position: ProblemPosition,
    /// Code fragment on the problem line the issue points at.
    #[serde(default)]
    pub indicator: String,
    /// Name of the symbol the producer attributed the problem to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub symbol: String,
}

/// A detected issue plus its suggested rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    #[serde(default = "InspectionId::generate")]
    pub id: InspectionId,
    pub problem: Problem,
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolDescriptor>,
}

impl Inspection {
    /// Create an inspection with a fresh id at an absolute line.
    pub fn new(description: impl Into<String>, line: u32, solution: impl Into<String>) -> Self {
        Inspection {
            id: InspectionId::generate(),
            problem: Problem {
                description: description.into(),
                position: ProblemPosition {
                    line,
                    relative_line: 0,
                },
                indicator: String::new(),
                symbol: String::new(),
            },
            solution: solution.into(),
            document: None,
            symbol: None,
        }
    }

    /// Set the indicator fragment.
    pub fn with_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.problem.indicator = indicator.into();
        self
    }

    pub fn line(&self) -> u32 {
        self.problem.position.line
    }

    /// User-facing text: `"<description>, maybe <solution>"`.
    pub fn message(&self) -> String {
        format!(
            "{}, maybe {}",
            self.problem.description,
            uncapitalize(&self.solution)
        )
    }

    /// Solution text used as the content identity of highlights.
    pub fn solution_key(&self) -> &str {
        self.solution.trim()
    }

    /// From the first non-whitespace character of the problem line to its end.
    pub fn hint_range(&self, document: &DocumentSnapshot) -> Range {
        let line = self.line();
        let text = document.line(line).unwrap_or("");
        let indent = text.chars().take_while(|c| c.is_whitespace()).count() as u32;
        let len = text.chars().count() as u32;
        if indent >= len {
            return Range::new(Position::new(line, 0), Position::new(line, len));
        }
        Range::new(Position::new(line, indent), Position::new(line, len))
    }

    /// Range of the indicator fragment on the problem line, or the hint range
    /// when the fragment is empty or absent from the line.
    pub fn indicator_range(&self, document: &DocumentSnapshot) -> Range {
        let indicator = self.problem.indicator.trim();
        let line = self.line();
        if indicator.is_empty() {
            return self.hint_range(document);
        }
        let Some(text) = document.line(line) else {
            return self.hint_range(document);
        };
        match text.find(indicator) {
            Some(byte_start) => {
                let start = text[..byte_start].chars().count() as u32;
                let end = start + indicator.chars().count() as u32;
                Range::new(Position::new(line, start), Position::new(line, end))
            }
            None => self.hint_range(document),
        }
    }
}

/// Lower-case the first character, leaving the rest untouched.
pub fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> DocumentSnapshot {
        DocumentSnapshot::new("Foo.java", "java", 1, text)
    }

    mod symbol_tests {
        use super::*;

        #[test]
        fn method_owns_every_line_of_its_span() {
            let method = SymbolDescriptor::new("run", SymbolKind::Method, Range::lines(10, 15));
            assert!(method.owns_line(10));
            assert!(method.owns_line(12));
            assert!(method.owns_line(15));
            assert!(!method.owns_line(16));
            assert!(!method.owns_line(9));
        }

        #[test]
        fn class_owns_only_declaration_line() {
            let class = SymbolDescriptor::new("Foo", SymbolKind::Class, Range::lines(5, 25));
            assert!(class.owns_line(5));
            assert!(!class.owns_line(6));
            assert!(!class.owns_line(20));
        }

        #[test]
        fn symbol_kind_serializes_lowercase() {
            let json = serde_json::to_string(&SymbolKind::Method).unwrap();
            assert_eq!(json, "\"method\"");
        }
    }

    mod inspection_tests {
        use super::*;

        #[test]
        fn generated_ids_are_unique() {
            let a = InspectionId::generate();
            let b = InspectionId::generate();
            assert_ne!(a, b);
            assert!(a.as_str().starts_with("insp_"));
        }

        #[test]
        fn message_uncapitalizes_solution() {
            let inspection = Inspection::new("Verbose loop", 3, "Use an enhanced for loop");
            assert_eq!(
                inspection.message(),
                "Verbose loop, maybe use an enhanced for loop"
            );
        }

        #[test]
        fn deserializing_without_id_generates_one() {
            let json = r#"{
                "problem": {"description": "d", "position": {"line": 4}},
                "solution": "s"
            }"#;
            let inspection: Inspection = serde_json::from_str(json).unwrap();
            assert!(inspection.id.as_str().starts_with("insp_"));
            assert_eq!(inspection.problem.position.relative_line, 0);
            assert!(inspection.document.is_none());
        }

        #[test]
        fn hint_range_skips_indentation() {
            let document = doc("class Foo {\n    int x = 1;\n}\n");
            let inspection = Inspection::new("d", 1, "s");
            let range = inspection.hint_range(&document);
            assert_eq!(range.start, Position::new(1, 4));
            assert_eq!(range.end, Position::new(1, 14));
        }

        #[test]
        fn indicator_range_finds_fragment() {
            let document = doc("class Foo {\n    String s = a + b;\n}\n");
            let inspection = Inspection::new("d", 1, "s").with_indicator("a + b");
            let range = inspection.indicator_range(&document);
            assert_eq!(range.start, Position::new(1, 15));
            assert_eq!(range.end, Position::new(1, 20));
        }

        #[test]
        fn indicator_range_falls_back_to_hint() {
            let document = doc("class Foo {\n    int x = 1;\n}\n");
            let inspection = Inspection::new("d", 1, "s").with_indicator("missing");
            assert_eq!(
                inspection.indicator_range(&document),
                inspection.hint_range(&document)
            );
        }
    }

    #[test]
    fn uncapitalize_handles_edges() {
        assert_eq!(uncapitalize(""), "");
        assert_eq!(uncapitalize("Use var"), "use var");
        assert_eq!(uncapitalize("x"), "x");
    }
}
