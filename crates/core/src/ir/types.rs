//! Type IR: structural, target-neutral representation of schemas.

use indexmap::IndexMap;
use serde::Serialize;

/// Primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// Untyped schema
    Any,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Null => "null",
            PrimitiveKind::Any => "any",
        }
    }

    /// Map a declared `type` keyword. `object` and `array` are not primitive.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => PrimitiveKind::String,
            "number" => PrimitiveKind::Number,
            "integer" => PrimitiveKind::Integer,
            "boolean" => PrimitiveKind::Boolean,
            "null" => PrimitiveKind::Null,
            _ => return None,
        })
    }
}

/// A single literal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl LiteralValue {
    /// Scalar JSON values only; arrays and objects have no literal form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        Some(match value {
            serde_json::Value::String(s) => LiteralValue::String(s.clone()),
            serde_json::Value::Number(n) => LiteralValue::Number(n.clone()),
            serde_json::Value::Bool(b) => LiteralValue::Bool(*b),
            serde_json::Value::Null => LiteralValue::Null,
            _ => return None,
        })
    }

    /// Whether this literal is a value of the declared primitive type.
    pub fn matches(&self, kind: PrimitiveKind) -> bool {
        match (self, kind) {
            (LiteralValue::String(_), PrimitiveKind::String) => true,
            (LiteralValue::Number(n), PrimitiveKind::Integer) => n.is_i64() || n.is_u64(),
            (LiteralValue::Number(_), PrimitiveKind::Number) => true,
            (LiteralValue::Bool(_), PrimitiveKind::Boolean) => true,
            _ => false,
        }
    }
}

/// Union discriminator: property name plus value-to-type mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
}

/// Object property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Normalized identifier
    pub name: String,
    /// Key as it appears in payloads
    pub wire_name: String,
    pub ty: TypeIr,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectType {
    pub fields: Vec<Field>,
    /// Value type of `additionalProperties` entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional: Option<Box<TypeIr>>,
}

impl ObjectType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Structural type.
///
/// `Reference` is a back-reference by name into the named-type table, never an
/// inline expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeIr {
    Primitive {
        name: PrimitiveKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Array {
        element: Box<TypeIr>,
    },
    Object(ObjectType),
    Union {
        members: Vec<TypeIr>,
        #[serde(skip_serializing_if = "Option::is_none")]
        discriminator: Option<Discriminator>,
    },
    EnumLiteral {
        values: Vec<LiteralValue>,
    },
    Literal {
        value: LiteralValue,
    },
    Intersection {
        members: Vec<TypeIr>,
    },
    Reference {
        name: String,
    },
}

impl TypeIr {
    pub fn primitive(name: PrimitiveKind) -> Self {
        TypeIr::Primitive { name, format: None }
    }

    pub fn any() -> Self {
        Self::primitive(PrimitiveKind::Any)
    }

    pub fn null() -> Self {
        Self::primitive(PrimitiveKind::Null)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeIr::Reference { name: name.into() }
    }

    pub fn array(element: TypeIr) -> Self {
        TypeIr::Array {
            element: Box::new(element),
        }
    }

    pub fn union(members: Vec<TypeIr>) -> Self {
        TypeIr::Union {
            members,
            discriminator: None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(
            self,
            TypeIr::Primitive {
                name: PrimitiveKind::Null,
                ..
            }
        )
    }

    /// `self | null`, without nesting when already nullable.
    pub fn nullable(self) -> Self {
        match self {
            ty if ty.is_null() => ty,
            TypeIr::Union {
                mut members,
                discriminator,
            } => {
                if !members.iter().any(TypeIr::is_null) {
                    members.push(TypeIr::null());
                }
                TypeIr::Union {
                    members,
                    discriminator,
                }
            }
            ty => TypeIr::union(vec![ty, TypeIr::null()]),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_nullable_does_not_nest() {
        let ty = TypeIr::primitive(PrimitiveKind::String).nullable().nullable();
        assert_eq!(
            ty,
            TypeIr::union(vec![TypeIr::primitive(PrimitiveKind::String), TypeIr::null()])
        );
    }

    #[test]
    fn test_literal_matches_declared_type() {
        let one = LiteralValue::from_json(&json!(1)).unwrap();
        let half = LiteralValue::from_json(&json!(0.5)).unwrap();
        assert!(one.matches(PrimitiveKind::Integer));
        assert!(one.matches(PrimitiveKind::Number));
        assert!(!half.matches(PrimitiveKind::Integer));
        assert!(!one.matches(PrimitiveKind::String));
        assert!(LiteralValue::from_json(&json!({ "a": 1 })).is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let ty = TypeIr::Primitive {
            name: PrimitiveKind::String,
            format: Some("date-time".into()),
        };
        assert_eq!(
            serde_json::to_value(&ty).unwrap(),
            json!({ "kind": "primitive", "name": "string", "format": "date-time" })
        );
    }
}
