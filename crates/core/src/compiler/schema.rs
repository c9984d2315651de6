//! Schema Compiler: schema nodes to Type IR.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::CompileContext;
use crate::error::{CompileError, Result};
use crate::ir::{Discriminator, Field, LiteralValue, ObjectType, PrimitiveKind, TypeIr};
use crate::resolver::DefinitionKind;
use crate::spec::{Schema, SchemaNode, SchemaType};
use crate::utils::{json_type_name, pointer_join, sanitize_identifier, unique_name};

impl CompileContext<'_> {
    /// Compile a schema node found at `pointer`.
    ///
    /// Named schemas reached through `$ref` are compiled once into the
    /// named-type table and appear here as `TypeIr::Reference`.
    pub fn compile(&mut self, node: &SchemaNode, pointer: &str) -> Result<TypeIr> {
        match node {
            SchemaNode::Schema(schema) => {
                let ty = self.compile_shape(schema, pointer)?;
                Ok(if schema.is_nullable() { ty.nullable() } else { ty })
            }
            SchemaNode::Other(serde_json::Value::Bool(true)) => Ok(TypeIr::any()),
            SchemaNode::Other(serde_json::Value::Object(_)) => {
                Err(CompileError::invalid(pointer, "malformed schema object"))
            }
            SchemaNode::Other(other) => Err(CompileError::invalid(
                pointer,
                format!("expected a schema object, found {}", json_type_name(other)),
            )),
        }
    }

    fn compile_shape(&mut self, schema: &Schema, pointer: &str) -> Result<TypeIr> {
        if let Some(ref_path) = &schema.ref_path {
            return self.compile_ref(ref_path);
        }
        if let Some(value) = &schema.const_value {
            return Ok(literal_or_any(value));
        }
        if let Some(members) = &schema.all_of {
            return self.compile_all_of(schema, members, pointer);
        }
        if let Some(members) = &schema.one_of {
            return self.compile_union(schema, members, pointer, "oneOf");
        }
        if let Some(members) = &schema.any_of {
            return self.compile_union(schema, members, pointer, "anyOf");
        }
        if let Some(values) = &schema.enum_values {
            return self.compile_enum(schema, values, pointer);
        }

        match &schema.schema_type {
            Some(SchemaType::Single(name)) => self.compile_typed(name, schema, pointer),
            Some(SchemaType::Multiple(names)) if names.is_empty() => Err(CompileError::invalid(
                pointer_join(pointer, "type"),
                "empty type list",
            )),
            Some(SchemaType::Multiple(_)) => match schema.declared_types().as_slice() {
                [] => Ok(TypeIr::null()),
                [single] => self.compile_typed(single, schema, pointer),
                many => many
                    .iter()
                    .map(|name| self.compile_typed(name, schema, pointer))
                    .collect::<Result<Vec<_>>>()
                    .map(TypeIr::union),
            },
            None if !schema.properties.is_empty() || schema.additional_properties.is_some() => {
                self.compile_object(schema, pointer)
            }
            None if schema.items.is_some() => self.compile_array(schema, pointer),
            None => Ok(TypeIr::any()),
        }
    }

    fn compile_typed(&mut self, name: &str, schema: &Schema, pointer: &str) -> Result<TypeIr> {
        match name {
            "object" => self.compile_object(schema, pointer),
            "array" => self.compile_array(schema, pointer),
            other => match PrimitiveKind::from_type_name(other) {
                Some(kind) => Ok(TypeIr::Primitive {
                    name: kind,
                    format: schema.format.clone(),
                }),
                None => Err(CompileError::invalid(
                    pointer_join(pointer, "type"),
                    format!("unknown type `{other}`"),
                )),
            },
        }
    }

    fn compile_array(&mut self, schema: &Schema, pointer: &str) -> Result<TypeIr> {
        let element = match &schema.items {
            Some(items) => self.compile(items, &pointer_join(pointer, "items"))?,
            None => TypeIr::any(),
        };
        Ok(TypeIr::array(element))
    }

    fn compile_object(&mut self, schema: &Schema, pointer: &str) -> Result<TypeIr> {
        let required: HashSet<&str> = schema.required.iter().map(String::as_str).collect();
        let properties = pointer_join(pointer, "properties");
        let mut used = HashSet::new();
        let mut fields = Vec::with_capacity(schema.properties.len());

        for (wire_name, node) in &schema.properties {
            let ty = self.compile(node, &pointer_join(&properties, wire_name))?;
            let name = claim_field_name(
                &mut used,
                self.options.field_casing.apply(wire_name),
                wire_name,
            );
            let (description, deprecated) = if self.options.include_docs {
                node.docs()
            } else {
                (None, false)
            };
            fields.push(Field {
                name,
                wire_name: wire_name.clone(),
                ty,
                required: required.contains(wire_name.as_str()),
                description: description.map(str::to_string),
                deprecated,
            });
        }

        let additional = match schema.additional_properties.as_deref() {
            None | Some(SchemaNode::Other(serde_json::Value::Bool(false))) => None,
            Some(SchemaNode::Other(serde_json::Value::Bool(true))) => Some(TypeIr::any()),
            Some(node) => Some(self.compile(node, &pointer_join(pointer, "additionalProperties"))?),
        };

        Ok(TypeIr::Object(ObjectType {
            fields,
            additional: additional.map(Box::new),
        }))
    }

    fn compile_members(
        &mut self,
        members: &[SchemaNode],
        pointer: &str,
        keyword: &str,
    ) -> Result<Vec<TypeIr>> {
        let base = pointer_join(pointer, keyword);
        if members.is_empty() {
            return Err(CompileError::invalid(base, format!("{keyword} has no members")));
        }
        members
            .iter()
            .enumerate()
            .map(|(i, member)| self.compile(member, &pointer_join(&base, &i.to_string())))
            .collect()
    }

    /// Inline object members merge into one object; anything else stays an
    /// intersection. Members that only list `required` names tighten the
    /// merged fields instead of becoming members of their own.
    fn compile_all_of(
        &mut self,
        schema: &Schema,
        members: &[SchemaNode],
        pointer: &str,
    ) -> Result<TypeIr> {
        let base = pointer_join(pointer, "allOf");
        if members.is_empty() {
            return Err(CompileError::invalid(base, "allOf has no members"));
        }
        let mut compiled = Vec::with_capacity(members.len() + 1);
        for (i, member) in members.iter().enumerate() {
            if member.as_schema().is_some_and(Schema::is_required_only) {
                continue;
            }
            compiled.push(self.compile(member, &pointer_join(&base, &i.to_string()))?);
        }
        if !schema.properties.is_empty() {
            compiled.push(self.compile_object(schema, pointer)?);
        }

        let extra_required: HashSet<&str> = members
            .iter()
            .filter_map(SchemaNode::as_schema)
            .chain(std::iter::once(schema))
            .flat_map(|s| s.required.iter().map(String::as_str))
            .collect();

        if compiled.is_empty() {
            return Ok(TypeIr::any());
        }
        if !compiled.iter().all(|ty| matches!(ty, TypeIr::Object(_))) {
            if compiled.len() == 1 {
                return Ok(compiled.remove(0));
            }
            return Ok(TypeIr::Intersection { members: compiled });
        }

        let mut merged = ObjectType::default();
        for ty in compiled {
            let TypeIr::Object(object) = ty else {
                continue;
            };
            for field in object.fields {
                match merged
                    .fields
                    .iter_mut()
                    .find(|f| f.wire_name == field.wire_name)
                {
                    Some(existing) => {
                        let required = existing.required || field.required;
                        *existing = field;
                        existing.required = required;
                    }
                    None => merged.fields.push(field),
                }
            }
            if object.additional.is_some() {
                merged.additional = object.additional;
            }
        }

        // members were named independently
        let mut used = HashSet::new();
        for field in &mut merged.fields {
            field.required |= extra_required.contains(field.wire_name.as_str());
            let name = std::mem::take(&mut field.name);
            field.name = claim_field_name(&mut used, name, &field.wire_name);
        }
        Ok(TypeIr::Object(merged))
    }

    fn compile_union(
        &mut self,
        schema: &Schema,
        members: &[SchemaNode],
        pointer: &str,
        keyword: &str,
    ) -> Result<TypeIr> {
        let mut compiled = self.compile_members(members, pointer, keyword)?;
        let discriminator = match &schema.discriminator {
            Some(discriminator) => Some(self.compile_discriminator(discriminator, members)?),
            None => None,
        };
        if compiled.len() == 1 && discriminator.is_none() {
            return Ok(compiled.remove(0));
        }
        Ok(TypeIr::Union {
            members: compiled,
            discriminator,
        })
    }

    fn compile_discriminator(
        &mut self,
        discriminator: &crate::spec::Discriminator,
        members: &[SchemaNode],
    ) -> Result<Discriminator> {
        let mut mapping = IndexMap::new();
        for (value, target) in &discriminator.mapping {
            let pointer = if target.starts_with('#') {
                target.clone()
            } else {
                DefinitionKind::Schema.pointer(target)
            };
            let component = self
                .resolver
                .component_name(DefinitionKind::Schema, &pointer)?;
            mapping.insert(value.clone(), self.type_name(component, &pointer)?);
        }
        // members without an explicit mapping use their component name
        for member in members.iter().filter_map(SchemaNode::as_schema) {
            let Some(ref_path) = &member.ref_path else {
                continue;
            };
            let component = self
                .resolver
                .component_name(DefinitionKind::Schema, ref_path)?;
            let name = self.type_name(component, ref_path)?;
            if !mapping.values().any(|target| *target == name) {
                mapping.insert(component.to_string(), name);
            }
        }
        Ok(Discriminator {
            property_name: discriminator.property_name.clone(),
            mapping,
        })
    }

    /// Enum-izable only when every value is a literal of the single declared
    /// scalar type; otherwise a union of literals.
    fn compile_enum(
        &mut self,
        schema: &Schema,
        values: &[serde_json::Value],
        pointer: &str,
    ) -> Result<TypeIr> {
        if values.is_empty() {
            return Err(CompileError::invalid(
                pointer_join(pointer, "enum"),
                "enum has no values",
            ));
        }
        let nullable = schema.is_nullable();
        let literals: Vec<Option<LiteralValue>> = values
            .iter()
            .filter(|v| !(nullable && v.is_null()))
            .map(LiteralValue::from_json)
            .collect();

        let base = match schema.declared_types().as_slice() {
            [single] => PrimitiveKind::from_type_name(single).filter(|kind| {
                matches!(
                    kind,
                    PrimitiveKind::String | PrimitiveKind::Integer | PrimitiveKind::Number
                )
            }),
            _ => None,
        };
        if let Some(kind) = base
            && !literals.is_empty()
            && literals
                .iter()
                .all(|l| l.as_ref().is_some_and(|l| l.matches(kind)))
        {
            return Ok(TypeIr::EnumLiteral {
                values: literals.into_iter().flatten().collect(),
            });
        }

        let mut members: Vec<TypeIr> = Vec::new();
        for literal in literals {
            let member = literal.map_or_else(TypeIr::any, |value| TypeIr::Literal { value });
            if !members.contains(&member) {
                members.push(member);
            }
        }
        Ok(match members.len() {
            0 => TypeIr::null(),
            1 => members.remove(0),
            _ => TypeIr::union(members),
        })
    }
}

/// Claim `name` for a field, falling back to the sanitized wire name with a
/// numeric suffix when casing folded two wire names together.
pub(super) fn claim_field_name(
    used: &mut HashSet<String>,
    name: String,
    wire_name: &str,
) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    unique_name(used, &sanitize_identifier(wire_name))
}

fn literal_or_any(value: &serde_json::Value) -> TypeIr {
    LiteralValue::from_json(value).map_or_else(TypeIr::any, |value| TypeIr::Literal { value })
}
