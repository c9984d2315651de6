//! Compile options, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};
use crate::utils::{sanitize_identifier, to_camel_identifier};

/// Identifier casing applied to property and parameter names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Casing {
    /// `created_at` becomes `createdAt`
    #[default]
    Camel,
    /// Wire names are kept, only made identifier-safe
    Preserve,
}

impl Casing {
    pub fn apply(&self, name: &str) -> String {
        match self {
            Casing::Camel => to_camel_identifier(name),
            Casing::Preserve => sanitize_identifier(name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompileOptions {
    /// Only compile types; skip operations and security.
    pub only_types: bool,
    /// Declare enum-izable named schemas as enums instead of aliases.
    pub generate_enums: bool,
    pub field_casing: Casing,
    /// Carry `description` and `deprecated` into declarations.
    pub include_docs: bool,
}

impl CompileOptions {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CompileError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CompileError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_kebab_case_keys() {
        let options = CompileOptions::from_toml_str(
            r#"
only-types = true
field-casing = "preserve"
"#,
        )
        .unwrap();
        assert_eq!(
            options,
            CompileOptions {
                only_types: true,
                generate_enums: false,
                field_casing: Casing::Preserve,
                include_docs: false,
            }
        );
    }

    #[test]
    fn test_unknown_casing_is_a_config_error() {
        let err = CompileOptions::from_toml_str(r#"field-casing = "shouty""#).unwrap_err();
        assert!(matches!(err, CompileError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "generate-enums = true").unwrap();
        let options = CompileOptions::from_file(file.path()).unwrap();
        assert!(options.generate_enums);
        assert_eq!(options.field_casing, Casing::Camel);
    }

    #[test]
    fn test_casing_apply() {
        assert_eq!(Casing::Camel.apply("created_at"), "createdAt");
        assert_eq!(Casing::Preserve.apply("created_at"), "created_at");
        assert_eq!(Casing::Preserve.apply("x-rate-limit"), "x_rate_limit");
    }
}
