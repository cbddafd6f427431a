//! Error types and error code constants for tuginspect.
//!
//! This module provides the unified error type (`InspectError`) used by the
//! inspection service, session and CLI, plus `RenderError` for renderer
//! strategies.
//!
//! ## Error Code Mapping
//!
//! Exit codes used by the CLI:
//! - `2`: Invalid arguments (bad input from caller, malformed script or config)
//! - `3`: Resolution errors (symbol or document not found)
//! - `10`: Internal errors (inspector failure, IO, unexpected state)
//!
//! ## Taxonomy
//!
//! - A cache miss is never an error; it is an `Option::None` on the read path.
//! - An inspector failure is an `InspectError::Producer` naming the failing
//!   scope. It is reported to the user and never cached as a ready result.
//! - Renderer failures are `RenderError`s. They are isolated per strategy and
//!   only logged.

use std::fmt;
use std::io;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (symbol not found, document not found).
    ResolutionError = 3,
    /// Internal errors (inspector failures, IO, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the inspection layer.
#[derive(Debug, Error)]
pub enum InspectError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The inspection-producing collaborator failed for a scope.
    ///
    /// `scope` is human readable, e.g. `class Foo` or `range [3, 9]`.
    #[error("failed to inspect {scope}: {message}")]
    Producer { scope: String, message: String },

    /// The symbol outline provider failed.
    #[error("symbol outline unavailable: {message}")]
    Outline { message: String },

    /// A named symbol does not exist in the document outline.
    #[error("no symbol named '{name}' in {path}")]
    SymbolNotFound { name: String, path: String },

    /// A document is not known to the caller.
    #[error("document not found: {path}")]
    DocumentNotFound { path: String },

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A replay script is malformed or inconsistent.
    #[error("script error: {message}")]
    Script { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result type for inspection operations.
pub type InspectResult<T> = Result<T, InspectError>;

impl From<&InspectError> for OutputErrorCode {
    fn from(err: &InspectError) -> Self {
        match err {
            InspectError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            InspectError::Config(_) => OutputErrorCode::InvalidArguments,
            InspectError::Script { .. } => OutputErrorCode::InvalidArguments,
            InspectError::Json(_) => OutputErrorCode::InvalidArguments,
            InspectError::SymbolNotFound { .. } => OutputErrorCode::ResolutionError,
            InspectError::DocumentNotFound { .. } => OutputErrorCode::ResolutionError,
            InspectError::Producer { .. } => OutputErrorCode::InternalError,
            InspectError::Outline { .. } => OutputErrorCode::InternalError,
            InspectError::Io(_) => OutputErrorCode::InternalError,
            InspectError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl InspectError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        InspectError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a producer failure for the given scope.
    pub fn producer(scope: impl Into<String>, message: impl Into<String>) -> Self {
        InspectError::Producer {
            scope: scope.into(),
            message: message.into(),
        }
    }

    /// Create a script error.
    pub fn script(message: impl Into<String>) -> Self {
        InspectError::Script {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        InspectError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Renderer Errors
// ============================================================================

/// Errors raised by a single renderer strategy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The strategy was asked to draw while uninstalled.
    #[error("renderer '{kind}' is not installed")]
    NotInstalled { kind: String },

    /// The drawing surface rejected an operation.
    #[error("surface error: {0}")]
    Surface(String),
}

// ============================================================================
// Tests
// ============================================================================
