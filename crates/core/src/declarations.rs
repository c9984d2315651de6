//! The declaration list handed to renderers.

use oaskit_runtime::TransformTable;
use serde::Serialize;

use crate::compiler::AuthConfiguration;
use crate::ir::{OperationDescriptor, TypeIr};

/// How a named type is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    /// `type Name = <ty>`
    Alias,
    /// A closed set of literal values
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDeclaration {
    pub name: String,
    /// Component name in the document
    pub wire_name: String,
    pub kind: DeclarationKind,
    pub ty: TypeIr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

/// What a generated client needs to build its request context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFactory {
    /// First declared server, if any
    pub server_url: Option<String>,
    /// Scheme names the context accepts configuration for
    pub auth_methods: Vec<String>,
}

/// Everything one compilation run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationList {
    pub title: String,
    pub version: String,
    pub types: Vec<TypeDeclaration>,
    pub operations: Vec<OperationDescriptor>,
    pub auth: AuthConfiguration,
    pub context: ContextFactory,
    pub transforms: TransformTable,
}

impl DeclarationList {
    pub fn type_declaration(&self, name: &str) -> Option<&TypeDeclaration> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }
}
