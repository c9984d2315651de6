//! Errors raised by the runtime auth hook.
//!
//! The transform interpreter has no error type: shape mismatches are no-ops.

use thiserror::Error;

/// Failure to install authentication on a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no configuration provided for security scheme '{0}'")]
    MissingConfig(String),

    #[error("configuration for security scheme '{scheme}' must provide {expected}")]
    ConfigMismatch { scheme: String, expected: String },

    #[error("unknown security scheme '{0}'")]
    UnknownScheme(String),

    #[error("auth provider failed: {0}")]
    Provider(String),
}
