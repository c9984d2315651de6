//! Pipeline Driver.
//!
//! The stages run strictly in order:
//! 1. Version check
//! 2. Schema phase: every component schema, in definition order
//! 3. Operation and security phases (skipped with `only_types`)
//! 4. Reference check and transform pruning
//! 5. Assembly of the declaration list
//!
//! Any error aborts the run; no partial declaration list is produced.

use tracing::{debug, info};

use crate::compiler::{
    AuthConfiguration, CompileContext, NamedType, compile_operations, compile_security,
};
use crate::declarations::{ContextFactory, DeclarationKind, DeclarationList, TypeDeclaration};
use crate::error::Result;
use crate::ir::TypeIr;
use crate::options::CompileOptions;
use crate::resolver::Resolver;
use crate::spec::{SpecDocument, check_version};

/// Compile a loaded document into a declaration list.
pub fn compile_spec(doc: &SpecDocument, options: &CompileOptions) -> Result<DeclarationList> {
    check_version(doc.openapi.as_deref())?;
    info!(title = %doc.info.title, version = %doc.info.version, "Compiling API description.");

    let resolver = Resolver::new(doc);
    let mut ctx = CompileContext::new(doc, &resolver, options);
    ctx.compile_components()?;

    let (mut operations, auth) = if options.only_types {
        (Vec::new(), AuthConfiguration::default())
    } else {
        let operations = compile_operations(&mut ctx, doc)?;
        let auth = compile_security(&resolver, doc)?;
        (operations, auth)
    };

    let compiled = ctx.finish()?;
    for op in &mut operations {
        if let Some(body) = &mut op.body {
            body.transforms.prune(&compiled.live);
        }
        for response in &mut op.responses {
            response.transforms.prune(&compiled.live);
        }
    }

    let types: Vec<TypeDeclaration> = compiled
        .types
        .into_iter()
        .map(|named| declare(named, options))
        .collect();
    debug!(
        types = types.len(),
        operations = operations.len(),
        schemes = auth.schemes().len(),
        "Compilation finished."
    );

    let context = ContextFactory {
        server_url: doc.servers.first().map(|server| server.url.clone()),
        auth_methods: auth.scheme_names(),
    };
    Ok(DeclarationList {
        title: doc.info.title.clone(),
        version: doc.info.version.clone(),
        types,
        operations,
        auth,
        context,
        transforms: compiled.transforms,
    })
}

/// Parse and compile a JSON document.
pub fn compile_json(text: &str, options: &CompileOptions) -> Result<DeclarationList> {
    compile_spec(&SpecDocument::from_json(text)?, options)
}

/// Parse and compile a YAML document.
pub fn compile_yaml(text: &str, options: &CompileOptions) -> Result<DeclarationList> {
    compile_spec(&SpecDocument::from_yaml(text)?, options)
}

fn declare(named: NamedType, options: &CompileOptions) -> TypeDeclaration {
    let kind = if options.generate_enums && matches!(named.ty, TypeIr::EnumLiteral { .. }) {
        DeclarationKind::Enum
    } else {
        DeclarationKind::Alias
    };
    TypeDeclaration {
        name: named.name,
        wire_name: named.wire_name,
        kind,
        ty: named.ty,
        description: named.description,
        deprecated: named.deprecated,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use pretty_assertions::assert_eq;

    const PETS: &str = r##"{
  "openapi": "3.0.3",
  "info": { "title": "Pets", "version": "1.2.0" },
  "servers": [{ "url": "https://pets.example.com/v1" }, { "url": "http://localhost" }],
  "security": [{ "key": [] }],
  "paths": {
    "/pets": {
      "get": {
        "operationId": "listPets",
        "responses": { "200": { "description": "OK", "content": { "application/json": {
          "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } } } } } }
      }
    }
  },
  "components": {
    "schemas": {
      "Pet": { "type": "object", "properties": { "name": { "type": "string" }, "kind": { "$ref": "#/components/schemas/Kind" } } },
      "Kind": { "type": "string", "enum": ["cat", "dog"] }
    },
    "securitySchemes": { "key": { "type": "apiKey", "name": "X-Key", "in": "header" } }
  }
}"##;

    #[test]
    fn test_context_factory_uses_first_server() {
        let list = compile_json(PETS, &CompileOptions::default()).unwrap();
        assert_eq!(list.title, "Pets");
        assert_eq!(
            list.context,
            ContextFactory {
                server_url: Some("https://pets.example.com/v1".into()),
                auth_methods: vec!["key".into()],
            }
        );
        assert_eq!(list.operations.len(), 1);
    }

    #[test]
    fn test_no_transforms_means_empty_links() {
        let list = compile_json(PETS, &CompileOptions::default()).unwrap();
        assert!(list.transforms.is_empty());
        let response = list.operation("listPets").unwrap().success_response().unwrap();
        assert!(response.transforms.is_empty());
    }

    #[test]
    fn test_enum_declarations() {
        let aliases = compile_json(PETS, &CompileOptions::default()).unwrap();
        assert_eq!(aliases.type_declaration("Kind").unwrap().kind, DeclarationKind::Alias);

        let options = CompileOptions {
            generate_enums: true,
            ..CompileOptions::default()
        };
        let enums = compile_json(PETS, &options).unwrap();
        assert_eq!(enums.type_declaration("Kind").unwrap().kind, DeclarationKind::Enum);
        assert_eq!(enums.type_declaration("Pet").unwrap().kind, DeclarationKind::Alias);
    }

    #[test]
    fn test_only_types_skips_operations_and_auth() {
        let options = CompileOptions {
            only_types: true,
            ..CompileOptions::default()
        };
        let list = compile_json(PETS, &options).unwrap();
        assert_eq!(list.types.len(), 2);
        assert!(list.operations.is_empty());
        assert!(list.auth.is_empty());
        assert!(list.context.auth_methods.is_empty());
    }

    #[test]
    fn test_version_checked_on_built_documents() {
        let doc = SpecDocument {
            openapi: Some("2.0".into()),
            ..SpecDocument::default()
        };
        assert_eq!(
            compile_spec(&doc, &CompileOptions::default()).unwrap_err(),
            CompileError::UnsupportedSpecVersion {
                found: Some("2.0".into())
            }
        );
    }
}
