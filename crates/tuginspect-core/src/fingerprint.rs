//! Content fingerprints for symbol spans.
//!
//! A fingerprint is the SHA-256 of the exact text covered by a symbol's
//! range, hex encoded. Nothing is normalized: whitespace and comments count.
//! The document version counter is never consulted, so fingerprints survive
//! version resets and reopened documents.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::text::DocumentSnapshot;
use crate::types::Range;

/// Content digest of a symbol's text span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolFingerprint(pub String);

impl SymbolFingerprint {
    /// Fingerprint the text `document` currently holds under `range`.
    pub fn compute(document: &DocumentSnapshot, range: &Range) -> Self {
        Self::of_text(&document.text_in(range))
    }

    /// Fingerprint a span of text.
    pub fn of_text(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        SymbolFingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0[..self.0.len().min(12)])
    }
}
