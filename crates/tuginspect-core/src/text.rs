//! Immutable document snapshots with line/character addressing.
//!
//! A [`DocumentSnapshot`] is what every collaborator sees of an editor
//! document: its identity, language, version counter and full text. Snapshots
//! are cheap to clone and never change; an edit produces a new snapshot.
//!
//! ## Coordinate Conventions
//!
//! - Lines and characters are **0-indexed**
//! - Characters count Unicode scalar values
//! - Positions past the end of a line or document are clamped

use std::path::PathBuf;
use std::sync::Arc;

use crate::types::{DocumentKey, DocumentRef, Position, Range};

/// Point-in-time view of a document.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    language_id: String,
    version: i32,
    text: Arc<str>,
    /// Byte offset of the first character of each line.
    line_starts: Arc<[usize]>,
}

impl DocumentSnapshot {
    pub fn new(
        key: impl Into<DocumentKey>,
        language_id: impl Into<String>,
        version: i32,
        text: impl Into<Arc<str>>,
    ) -> Self {
        let text: Arc<str> = text.into();
        let line_starts = compute_line_starts(&text);
        DocumentSnapshot {
            key: key.into(),
            language_id: language_id.into(),
            version,
            text,
            line_starts,
        }
    }

    /// Produce the next snapshot of the same document with new text.
    pub fn edited(&self, text: impl Into<Arc<str>>) -> Self {
        DocumentSnapshot::new(
            self.key.clone(),
            self.language_id.clone(),
            self.version + 1,
            text,
        )
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Back-reference to this snapshot.
    pub fn reference(&self) -> DocumentRef {
        DocumentRef {
            key: self.key.clone(),
            version: self.version,
        }
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Text of a line without its terminator.
    pub fn line(&self, line: u32) -> Option<&str> {
        let idx = line as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or(self.text.len());
        let raw = &self.text[start..end];
        let raw = raw.strip_suffix('\n').unwrap_or(raw);
        Some(raw.strip_suffix('\r').unwrap_or(raw))
    }

    /// Exact text covered by `range`, clamped to the document.
    pub fn text_in(&self, range: &Range) -> String {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end).max(start);
        self.text[start..end].to_string()
    }

    /// Byte offset of a position. Characters past the end of a line clamp to
    /// the line end (before the terminator); lines past the end clamp to the
    /// end of the document.
    pub fn offset_at(&self, position: Position) -> usize {
        let idx = position.line as usize;
        let Some(&line_start) = self.line_starts.get(idx) else {
            return self.text.len();
        };
        let line_end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or(self.text.len());
        let line_text = &self.text[line_start..line_end];
        let content_len = line_text.trim_end_matches(['\n', '\r']).len();

        match line_text[..content_len]
            .char_indices()
            .nth(position.character as usize)
        {
            Some((byte, _)) => line_start + byte,
            None => line_start + content_len,
        }
    }
}

impl From<&str> for DocumentKey {
    fn from(path: &str) -> Self {
        DocumentKey::new(path)
    }
}

impl From<String> for DocumentKey {
    fn from(path: String) -> Self {
        DocumentKey::new(path)
    }
}

impl From<PathBuf> for DocumentKey {
    fn from(path: PathBuf) -> Self {
        DocumentKey(path)
    }
}

fn compute_line_starts(text: &str) -> Arc<[usize]> {
    let mut starts = vec![0];
    starts.extend(
        text.bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i + 1)
            .filter(|&i| i < text.len()),
    );
    starts.into()
}

// ============================================================================
// Tests
// ============================================================================
