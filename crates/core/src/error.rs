//! Compilation errors.
//!
//! Every variant is fatal: the pipeline aborts and no partial declaration list
//! is produced.

use thiserror::Error;

/// Result alias used across the compiler.
pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A reference that does not address any definition of the expected kind.
    #[error("unresolved reference '{pointer}'")]
    UnresolvedReference { pointer: String },

    /// Structurally nonsensical schema or composition.
    #[error("invalid schema at '{pointer}': {reason}")]
    InvalidSchema { pointer: String, reason: String },

    /// Missing or unsupported `openapi` version marker.
    #[error("unsupported spec version: {}", found.as_deref().unwrap_or("<missing>"))]
    UnsupportedSpecVersion { found: Option<String> },

    #[error("duplicate operation id '{0}'")]
    DuplicateOperationId(String),

    #[error("duplicate {location} parameter '{name}'")]
    DuplicateParameter { location: String, name: String },

    /// The document could not be deserialized.
    #[error("failed to parse API description: {0}")]
    Parse(String),

    /// Compile options could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The declaration list could not be rendered.
    #[error("failed to emit declarations: {0}")]
    Output(String),
}

impl CompileError {
    pub(crate) fn unresolved(pointer: impl Into<String>) -> Self {
        CompileError::UnresolvedReference {
            pointer: pointer.into(),
        }
    }

    pub(crate) fn invalid(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::InvalidSchema {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }
}
