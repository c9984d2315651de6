//! Reference Resolver: pointer lookup over the component pools.
//!
//! All pools are indexed once at construction; resolution is a pure map lookup
//! with no I/O, so repeated lookups of the same pointer are idempotent.

use std::collections::HashMap;

use crate::error::{CompileError, Result};
use crate::spec::{
    Parameter, RefOr, RequestBody, Response, SchemaNode, SecurityScheme, SpecDocument,
};
use crate::utils::{decode_pointer_segment, escape_pointer_segment};

const COMPONENTS_PREFIX: &str = "#/components/";

/// Definition pool a pointer addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Schema,
    Parameter,
    Response,
    RequestBody,
    SecurityScheme,
}

impl DefinitionKind {
    /// Section name under `#/components/`.
    pub fn section(&self) -> &'static str {
        match self {
            DefinitionKind::Schema => "schemas",
            DefinitionKind::Parameter => "parameters",
            DefinitionKind::Response => "responses",
            DefinitionKind::RequestBody => "requestBodies",
            DefinitionKind::SecurityScheme => "securitySchemes",
        }
    }

    fn from_section(section: &str) -> Option<Self> {
        Some(match section {
            "schemas" => DefinitionKind::Schema,
            "parameters" => DefinitionKind::Parameter,
            "responses" => DefinitionKind::Response,
            "requestBodies" => DefinitionKind::RequestBody,
            "securitySchemes" => DefinitionKind::SecurityScheme,
            _ => return None,
        })
    }

    /// Canonical pointer for a component name.
    pub fn pointer(&self, name: &str) -> String {
        format!(
            "{COMPONENTS_PREFIX}{}/{}",
            self.section(),
            escape_pointer_segment(name)
        )
    }
}

/// A resolved definition.
#[derive(Debug, Clone, Copy)]
pub enum Definition<'a> {
    Schema(&'a SchemaNode),
    Parameter(&'a RefOr<Parameter>),
    Response(&'a RefOr<Response>),
    RequestBody(&'a RefOr<RequestBody>),
    SecurityScheme(&'a RefOr<SecurityScheme>),
}

#[derive(Debug)]
struct Entry<'a> {
    name: &'a str,
    definition: Definition<'a>,
}

/// Pointer index over one document.
#[derive(Debug)]
pub struct Resolver<'a> {
    index: HashMap<(DefinitionKind, String), Entry<'a>>,
}

impl<'a> Resolver<'a> {
    pub fn new(doc: &'a SpecDocument) -> Self {
        let components = &doc.components;
        let mut index = HashMap::new();
        let mut add = |kind: DefinitionKind, name: &'a str, definition: Definition<'a>| {
            index.insert((kind, name.to_string()), Entry { name, definition });
        };
        for (name, node) in &components.schemas {
            add(DefinitionKind::Schema, name, Definition::Schema(node));
        }
        for (name, param) in &components.parameters {
            add(DefinitionKind::Parameter, name, Definition::Parameter(param));
        }
        for (name, response) in &components.responses {
            add(DefinitionKind::Response, name, Definition::Response(response));
        }
        for (name, body) in &components.request_bodies {
            add(DefinitionKind::RequestBody, name, Definition::RequestBody(body));
        }
        for (name, scheme) in &components.security_schemes {
            add(
                DefinitionKind::SecurityScheme,
                name,
                Definition::SecurityScheme(scheme),
            );
        }
        Self { index }
    }

    /// Resolve `pointer` in the pool for `kind`.
    ///
    /// Fails with `UnresolvedReference` carrying the pointer exactly as given
    /// when it is not a local component pointer, names another pool, or names
    /// nothing.
    pub fn resolve(&self, kind: DefinitionKind, pointer: &str) -> Result<Definition<'a>> {
        self.entry(kind, pointer).map(|entry| entry.definition)
    }

    /// Component name a pointer resolves to.
    pub fn component_name(&self, kind: DefinitionKind, pointer: &str) -> Result<&'a str> {
        self.entry(kind, pointer).map(|entry| entry.name)
    }

    pub fn schema(&self, pointer: &str) -> Result<(&'a str, &'a SchemaNode)> {
        let entry = self.entry(DefinitionKind::Schema, pointer)?;
        match entry.definition {
            Definition::Schema(node) => Ok((entry.name, node)),
            _ => Err(CompileError::unresolved(pointer)),
        }
    }

    pub fn parameter(&self, pointer: &str) -> Result<&'a RefOr<Parameter>> {
        match self.resolve(DefinitionKind::Parameter, pointer)? {
            Definition::Parameter(param) => Ok(param),
            _ => Err(CompileError::unresolved(pointer)),
        }
    }

    pub fn response(&self, pointer: &str) -> Result<&'a RefOr<Response>> {
        match self.resolve(DefinitionKind::Response, pointer)? {
            Definition::Response(response) => Ok(response),
            _ => Err(CompileError::unresolved(pointer)),
        }
    }

    pub fn request_body(&self, pointer: &str) -> Result<&'a RefOr<RequestBody>> {
        match self.resolve(DefinitionKind::RequestBody, pointer)? {
            Definition::RequestBody(body) => Ok(body),
            _ => Err(CompileError::unresolved(pointer)),
        }
    }

    pub fn security_scheme(&self, pointer: &str) -> Result<&'a RefOr<SecurityScheme>> {
        match self.resolve(DefinitionKind::SecurityScheme, pointer)? {
            Definition::SecurityScheme(scheme) => Ok(scheme),
            _ => Err(CompileError::unresolved(pointer)),
        }
    }

    fn entry(&self, kind: DefinitionKind, pointer: &str) -> Result<&Entry<'a>> {
        let (section, name) =
            split_pointer(pointer).ok_or_else(|| CompileError::unresolved(pointer))?;
        if DefinitionKind::from_section(&section) != Some(kind) {
            return Err(CompileError::unresolved(pointer));
        }
        self.index
            .get(&(kind, name))
            .ok_or_else(|| CompileError::unresolved(pointer))
    }
}

/// Split `#/components/<section>/<name>` into its decoded parts.
fn split_pointer(pointer: &str) -> Option<(String, String)> {
    let rest = pointer.strip_prefix(COMPONENTS_PREFIX)?;
    let (section, name) = rest.split_once('/')?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some((
        decode_pointer_segment(section),
        decode_pointer_segment(name),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc() -> SpecDocument {
        SpecDocument::from_json(
            r##"{
  "openapi": "3.0.3",
  "components": {
    "schemas": {
      "Pet": { "type": "object" },
      "a/b": { "type": "string" },
      "My Schema": { "type": "integer" }
    },
    "parameters": { "Limit": { "name": "limit", "in": "query", "schema": { "type": "integer" } } },
    "securitySchemes": { "basic": { "type": "http", "scheme": "basic" } }
  }
}"##,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_schema() {
        let doc = doc();
        let resolver = Resolver::new(&doc);
        let (name, _) = resolver.schema("#/components/schemas/Pet").unwrap();
        assert_eq!(name, "Pet");
    }

    #[test]
    fn test_escaped_and_percent_encoded_names() {
        let doc = doc();
        let resolver = Resolver::new(&doc);
        assert_eq!(resolver.schema("#/components/schemas/a~1b").unwrap().0, "a/b");
        assert_eq!(
            resolver.schema("#/components/schemas/My%20Schema").unwrap().0,
            "My Schema"
        );
        assert_eq!(DefinitionKind::Schema.pointer("a/b"), "#/components/schemas/a~1b");
    }

    #[test]
    fn test_missing_pointer_names_the_pointer() {
        let doc = doc();
        let resolver = Resolver::new(&doc);
        let err = resolver.schema("#/components/schemas/Missing").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedReference {
                pointer: "#/components/schemas/Missing".into()
            }
        );
    }

    #[test]
    fn test_wrong_pool_is_unresolved() {
        let doc = doc();
        let resolver = Resolver::new(&doc);
        assert!(resolver.schema("#/components/parameters/Limit").is_err());
        assert!(resolver.parameter("#/components/parameters/Limit").is_ok());
        assert!(resolver.security_scheme("#/components/securitySchemes/basic").is_ok());
    }

    #[test]
    fn test_external_pointers_are_unresolved() {
        let doc = doc();
        let resolver = Resolver::new(&doc);
        assert!(resolver.schema("other.yaml#/components/schemas/Pet").is_err());
        assert!(resolver.schema("#/definitions/Pet").is_err());
    }

    #[test]
    fn test_repeated_lookup_is_stable() {
        let doc = doc();
        let resolver = Resolver::new(&doc);
        let pet = "#/components/schemas/Pet";
        let first = resolver.component_name(DefinitionKind::Schema, pet).unwrap();
        let second = resolver.component_name(DefinitionKind::Schema, pet).unwrap();
        assert_eq!(first, second);
    }
}
