//! JSON output types for CLI responses.
//!
//! Every command prints exactly one JSON document on stdout:
//!
//! 1. **Always JSON:** errors included, never mixed text/JSON
//! 2. **Status first:** every response starts with `status`
//! 3. **Deterministic:** same input, same bytes
//! 4. **Versioned:** `schema_version` on every response

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use tuginspect_core::error::{InspectError, OutputErrorCode};

use crate::config::Config;
use crate::render::RendererKind;
use crate::replay::ReplayFrame;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Errors
// ============================================================================

/// Error details in a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &InspectError) -> Self {
        let details = match err {
            InspectError::Producer { scope, .. } => Some(serde_json::json!({ "scope": scope })),
            InspectError::SymbolNotFound { name, path } => {
                Some(serde_json::json!({ "name": name, "path": path }))
            }
            InspectError::DocumentNotFound { path } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &InspectError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Totals over a replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub steps: usize,
    /// Steps whose command failed.
    pub failed: usize,
    pub inspector_calls: usize,
    pub notifications: usize,
}

impl ReplaySummary {
    pub fn from_frames(frames: &[ReplayFrame]) -> Self {
        ReplaySummary {
            steps: frames.len(),
            failed: frames.iter().filter(|f| !f.ok).count(),
            inspector_calls: frames.last().map(|f| f.inspector_calls).unwrap_or(0),
            notifications: frames.iter().map(|f| f.notifications.len()).sum(),
        }
    }
}

/// Response for the replay command.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResponse {
    /// Status: "ok" (individual steps may still have failed).
    pub status: String,
    pub schema_version: String,
    /// Script path as given.
    pub script: String,
    pub summary: ReplaySummary,
    pub frames: Vec<ReplayFrame>,
}

impl ReplayResponse {
    pub fn new(script: impl Into<String>, frames: Vec<ReplayFrame>) -> Self {
        ReplayResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            script: script.into(),
            summary: ReplaySummary::from_frames(&frames),
            frames,
        }
    }
}

/// Response for the config command.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub status: String,
    pub schema_version: String,
    /// File the configuration came from, absent when defaults apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub config: Config,
    /// Renderers the configuration enables.
    pub renderers: Vec<RendererKind>,
}

impl ConfigResponse {
    pub fn new(source: Option<String>, config: Config) -> Self {
        let renderers = config.inspection.renderer.enabled_kinds();
        ConfigResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            source,
            config,
            renderers,
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
