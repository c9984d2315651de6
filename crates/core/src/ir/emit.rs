//! Signature notation for IR nodes via the Emit trait.
//!
//! The notation is compact and target-neutral:
//! `{ id: string, createdAt?: string<date-time> }`, `Item[]`, `"a" | "b"`.

use super::api::{OperationDescriptor, ParameterBinding, PathPart};
use super::types::{Field, LiteralValue, ObjectType, PrimitiveKind, TypeIr};
use crate::utils::{escape_string, quote_if_needed};

/// Render an IR node as a signature string.
pub trait Emit {
    fn emit(&self) -> String;
}

impl Emit for PrimitiveKind {
    fn emit(&self) -> String {
        self.as_str().to_string()
    }
}

impl Emit for LiteralValue {
    fn emit(&self) -> String {
        match self {
            LiteralValue::String(s) => format!("\"{}\"", escape_string(s)),
            LiteralValue::Number(n) => n.to_string(),
            LiteralValue::Bool(b) => b.to_string(),
            LiteralValue::Null => "null".to_string(),
        }
    }
}

impl Emit for TypeIr {
    fn emit(&self) -> String {
        match self {
            TypeIr::Primitive { name, format } => match format {
                Some(format) => format!("{}<{format}>", name.emit()),
                None => name.emit(),
            },
            TypeIr::Array { element } => {
                let inner = element.emit();
                if matches!(
                    **element,
                    TypeIr::Union { .. } | TypeIr::Intersection { .. } | TypeIr::EnumLiteral { .. }
                ) {
                    format!("({inner})[]")
                } else {
                    format!("{inner}[]")
                }
            }
            TypeIr::Object(object) => object.emit(),
            TypeIr::Union { members, .. } => members
                .iter()
                .map(Emit::emit)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeIr::EnumLiteral { values } => values
                .iter()
                .map(Emit::emit)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeIr::Literal { value } => value.emit(),
            TypeIr::Intersection { members } => members
                .iter()
                .map(|member| {
                    let s = member.emit();
                    if matches!(member, TypeIr::Union { .. } | TypeIr::EnumLiteral { .. }) {
                        format!("({s})")
                    } else {
                        s
                    }
                })
                .collect::<Vec<_>>()
                .join(" & "),
            TypeIr::Reference { name } => name.clone(),
        }
    }
}

impl Emit for ObjectType {
    fn emit(&self) -> String {
        let mut parts: Vec<String> = self.fields.iter().map(Emit::emit).collect();
        if let Some(additional) = &self.additional {
            parts.push(format!("[key: string]: {}", additional.emit()));
        }
        if parts.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", parts.join(", "))
        }
    }
}

impl Emit for Field {
    fn emit(&self) -> String {
        let opt = if self.required { "" } else { "?" };
        format!("{}{opt}: {}", quote_if_needed(&self.name), self.ty.emit())
    }
}

impl Emit for ParameterBinding {
    fn emit(&self) -> String {
        let opt = if self.required { "" } else { "?" };
        format!(
            "{}{opt}: {} in {}",
            quote_if_needed(&self.name),
            self.ty.emit(),
            self.location.as_str()
        )
    }
}

impl Emit for OperationDescriptor {
    /// `listItems(limit?: integer in query) GET /items -> Item[]`
    fn emit(&self) -> String {
        let mut args: Vec<String> = self.parameters.iter().map(Emit::emit).collect();
        if let Some(body) = &self.body {
            let opt = if body.required { "" } else { "?" };
            args.push(format!("body{opt}: {}", body.ty.emit()));
        }
        let result = self
            .success_response()
            .and_then(|r| r.ty.as_ref())
            .map_or_else(|| "void".to_string(), Emit::emit);
        let path: String = self
            .path_parts
            .iter()
            .map(|part| match part {
                PathPart::Static(s) => s.clone(),
                PathPart::Param(p) => format!("{{{p}}}"),
            })
            .collect();
        format!(
            "{}({}) {} {path} -> {result}",
            self.name,
            args.join(", "),
            self.method.as_str()
        )
    }
}
