//! Compilation context and the compilers that thread it.
//!
//! `CompileContext` lives for exactly one compilation run. It holds the
//! resolver, the options, the named-type table and the transform table being
//! accumulated; `finish` checks the reference invariant and hands the tables
//! over read-only.

mod operation;
mod schema;
mod security;
mod transforms;

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::IndexMap;
use oaskit_runtime::{TransformKind, TransformTable};
use tracing::debug;

use crate::error::{CompileError, Result};
use crate::ir::TypeIr;
use crate::options::CompileOptions;
use crate::resolver::{DefinitionKind, Resolver};
use crate::spec::{SchemaNode, SpecDocument};
use crate::utils::{sanitize_identifier, unique_name};

pub use operation::compile_operations;
pub use security::{AuthConfiguration, compile_security};
pub use transforms::derive_programs;

/// A compiled component schema.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    /// Sanitized type identifier
    pub name: String,
    /// Component name in the document
    pub wire_name: String,
    pub ty: TypeIr,
    pub description: Option<String>,
    pub deprecated: bool,
}

/// Output of the schema phase.
#[derive(Debug, Clone)]
pub struct CompiledSchemas {
    /// In component definition order
    pub types: Vec<NamedType>,
    pub transforms: TransformTable,
    /// Names with effective programs, per kind
    pub live: BTreeMap<TransformKind, HashSet<String>>,
}

#[derive(Debug)]
pub struct CompileContext<'a> {
    resolver: &'a Resolver<'a>,
    options: &'a CompileOptions,
    /// Component name to type identifier, in definition order
    type_names: IndexMap<&'a str, String>,
    types: HashMap<String, NamedType>,
    in_progress: HashSet<String>,
    transforms: TransformTable,
    /// Every emitted reference with the pointer it came from
    references: IndexMap<String, String>,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        doc: &'a SpecDocument,
        resolver: &'a Resolver<'a>,
        options: &'a CompileOptions,
    ) -> Self {
        let mut taken = HashSet::new();
        let mut type_names = IndexMap::new();
        for component in doc.components.schemas.keys() {
            let name = unique_name(&mut taken, &sanitize_identifier(component));
            type_names.insert(component.as_str(), name);
        }
        Self {
            resolver,
            options,
            type_names,
            types: HashMap::new(),
            in_progress: HashSet::new(),
            transforms: TransformTable::new(),
            references: IndexMap::new(),
        }
    }

    pub fn resolver(&self) -> &'a Resolver<'a> {
        self.resolver
    }

    pub fn options(&self) -> &'a CompileOptions {
        self.options
    }

    /// Compile every component schema in definition order.
    pub fn compile_components(&mut self) -> Result<()> {
        let components: Vec<&'a str> = self.type_names.keys().copied().collect();
        for component in components {
            self.compile_ref(&DefinitionKind::Schema.pointer(component))?;
        }
        Ok(())
    }

    /// Compile the schema `pointer` addresses, returning a reference to it.
    ///
    /// A schema already compiled, or currently being compiled further up the
    /// stack, is not entered again.
    pub fn compile_ref(&mut self, pointer: &str) -> Result<TypeIr> {
        let (component, node) = self.resolver.schema(pointer)?;
        let name = self.type_name(component, pointer)?;
        self.references
            .entry(name.clone())
            .or_insert_with(|| pointer.to_string());
        if self.types.contains_key(&name) || self.in_progress.contains(&name) {
            return Ok(TypeIr::reference(name));
        }
        self.compile_named(component, &name, node)?;
        Ok(TypeIr::reference(name))
    }

    fn compile_named(&mut self, component: &str, name: &str, node: &SchemaNode) -> Result<()> {
        debug!(schema = component, "Compiling schema.");
        self.in_progress.insert(name.to_string());
        let ty = self.compile(node, &DefinitionKind::Schema.pointer(component))?;
        self.in_progress.remove(name);

        for kind in TransformKind::ALL {
            self.transforms
                .insert(kind, name, derive_programs(kind, &ty));
        }
        let (description, deprecated) = if self.options.include_docs {
            node.docs()
        } else {
            (None, false)
        };
        self.types.insert(
            name.to_string(),
            NamedType {
                name: name.to_string(),
                wire_name: component.to_string(),
                ty,
                description: description.map(str::to_string),
                deprecated,
            },
        );
        Ok(())
    }

    fn type_name(&self, component: &str, pointer: &str) -> Result<String> {
        self.type_names
            .get(component)
            .cloned()
            .ok_or_else(|| CompileError::unresolved(pointer))
    }

    /// Check that every reference names a compiled type, then prune transform
    /// programs that cannot reach a conversion.
    pub fn finish(mut self) -> Result<CompiledSchemas> {
        for (name, pointer) in &self.references {
            if !self.types.contains_key(name) {
                return Err(CompileError::invalid(
                    pointer.clone(),
                    format!("reference to `{name}` was never compiled"),
                ));
            }
        }

        let live = self.transforms.prune();
        for (kind, names) in &live {
            debug!(kind = %kind, live = names.len(), "Pruned transform table.");
        }

        let types = self
            .type_names
            .values()
            .filter_map(|name| self.types.remove(name))
            .collect();
        Ok(CompiledSchemas {
            types,
            transforms: self.transforms,
            live,
        })
    }
}
