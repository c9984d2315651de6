//! Renderers for a compiled declaration list.

use crate::declarations::DeclarationList;
use crate::error::{CompileError, Result};

/// Turns a declaration list into target text.
pub trait DeclarationEmitter {
    fn emit(&self, declarations: &DeclarationList) -> Result<String>;
}

/// Pretty-printed JSON of the whole declaration list.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEmitter;

impl DeclarationEmitter for JsonEmitter {
    fn emit(&self, declarations: &DeclarationList) -> Result<String> {
        let mut out = serde_json::to_string_pretty(declarations)
            .map_err(|e| CompileError::Output(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}
