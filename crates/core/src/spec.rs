//! OpenAPI 3.x document model for serde deserialization.
//!
//! Only the subset needed to derive types, operations, transforms and security
//! descriptors is modelled. Unknown keywords are ignored. Maps keep definition
//! order.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{CompileError, Result};

/// Root API description. Immutable once loaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecDocument {
    pub openapi: Option<String>,
    #[serde(default)]
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    #[serde(default)]
    pub components: Components,
    /// Root-level security requirements, applied when an operation declares none.
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Scheme name to required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

/// Reusable definition pools.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, SchemaNode>,
    #[serde(default)]
    pub parameters: IndexMap<String, RefOr<Parameter>>,
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<Response>>,
    #[serde(default)]
    pub request_bodies: IndexMap<String, RefOr<RequestBody>>,
    #[serde(default)]
    pub security_schemes: IndexMap<String, RefOr<SecurityScheme>>,
}

/// A `$ref` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub ref_path: String,
}

/// Either a reference or an inline definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref(Reference),
    Item(T),
}

/// HTTP verb of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Lowercase key used in path items.
    pub fn key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }
}

/// A path item containing operations for different HTTP methods.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
    /// Path-level parameters shared by all operations.
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
}

impl PathItem {
    /// Declared operations in canonical verb order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        [
            (HttpMethod::Get, self.get.as_ref()),
            (HttpMethod::Put, self.put.as_ref()),
            (HttpMethod::Post, self.post.as_ref()),
            (HttpMethod::Delete, self.delete.as_ref()),
            (HttpMethod::Options, self.options.as_ref()),
            (HttpMethod::Head, self.head.as_ref()),
            (HttpMethod::Patch, self.patch.as_ref()),
            (HttpMethod::Trace, self.trace.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.map(|op| (method, op)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
    pub request_body: Option<RefOr<RequestBody>>,
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<Response>>,
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    pub schema: Option<SchemaNode>,
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub required: bool,
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Media type content (e.g. `application/json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    pub schema: Option<SchemaNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    /// HTTP auth scheme name (`basic`, `bearer`, ...)
    pub scheme: Option<String>,
    pub bearer_format: Option<String>,
    /// Header, query or cookie name of an API key
    pub name: Option<String>,
    #[serde(rename = "in")]
    pub location: Option<String>,
    pub open_id_connect_url: Option<String>,
    pub description: Option<String>,
}

/// Anything found where a schema is expected.
///
/// Non-object nodes are kept as raw JSON so that the compiler can report them
/// with their pointer instead of failing the whole parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaNode {
    Schema(Box<Schema>),
    Other(serde_json::Value),
}

/// JSON Schema definition used in OpenAPI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,

    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    pub format: Option<String>,

    #[serde(default)]
    pub properties: IndexMap<String, SchemaNode>,

    #[serde(default)]
    pub required: Vec<String>,

    pub items: Option<Box<SchemaNode>>,

    /// Either a boolean or a schema; booleans land in `SchemaNode::Other`.
    pub additional_properties: Option<Box<SchemaNode>>,

    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<serde_json::Value>>,

    #[serde(rename = "const")]
    pub const_value: Option<serde_json::Value>,

    pub one_of: Option<Vec<SchemaNode>>,
    pub any_of: Option<Vec<SchemaNode>>,
    pub all_of: Option<Vec<SchemaNode>>,

    pub discriminator: Option<Discriminator>,

    /// OpenAPI 3.0 nullable flag (3.1 uses type arrays instead).
    pub nullable: Option<bool>,

    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

/// Schema type can be a single type or an array of types (for nullable).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
}

impl Schema {
    /// Declared types other than `null`, in declaration order.
    pub fn declared_types(&self) -> Vec<&str> {
        match &self.schema_type {
            Some(SchemaType::Single(t)) if t != "null" => vec![t.as_str()],
            Some(SchemaType::Multiple(types)) => types
                .iter()
                .map(String::as_str)
                .filter(|t| *t != "null")
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True for the 3.0 `nullable` flag or a `null` entry in a type array.
    pub fn is_nullable(&self) -> bool {
        if self.nullable == Some(true) {
            return true;
        }
        match &self.schema_type {
            Some(SchemaType::Multiple(types)) => types.iter().any(|t| t == "null"),
            _ => false,
        }
    }

    /// Only lists `required` names, as `allOf` members do to tighten a
    /// sibling object.
    pub fn is_required_only(&self) -> bool {
        !self.required.is_empty()
            && self.schema_type.is_none()
            && self.ref_path.is_none()
            && self.properties.is_empty()
            && self.items.is_none()
            && self.additional_properties.is_none()
            && self.enum_values.is_none()
            && self.const_value.is_none()
            && self.one_of.is_none()
            && self.any_of.is_none()
            && self.all_of.is_none()
    }
}

impl SchemaNode {
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaNode::Schema(schema) => Some(schema),
            SchemaNode::Other(_) => None,
        }
    }

    /// `description` and `deprecated` of a schema object.
    pub fn docs(&self) -> (Option<&str>, bool) {
        match self {
            SchemaNode::Schema(schema) => (schema.description.as_deref(), schema.deprecated),
            SchemaNode::Other(_) => (None, false),
        }
    }
}

impl SpecDocument {
    /// Parse a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| CompileError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| CompileError::Parse(e.to_string()))?;
        let value = serde_json::to_value(yaml).map_err(|e| CompileError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Build from an already parsed JSON tree. The version marker is checked
    /// before the rest of the document is interpreted.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self> {
        let marker = value
            .get("openapi")
            .or_else(|| value.get("swagger"))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        if value.get("openapi").is_none() {
            return Err(CompileError::UnsupportedSpecVersion { found: marker });
        }
        check_version(marker.as_deref())?;
        // YAML reads `openapi: 3.0` as a number
        if let Some(root) = value.as_object_mut()
            && let Some(marker) = marker
        {
            root.insert("openapi".to_string(), serde_json::Value::String(marker));
        }
        serde_json::from_value(value).map_err(|e| CompileError::Parse(e.to_string()))
    }
}

/// Only OpenAPI 3.x documents are accepted.
pub fn check_version(found: Option<&str>) -> Result<()> {
    match found {
        Some(version) if version.starts_with("3.") => Ok(()),
        other => Err(CompileError::UnsupportedSpecVersion {
            found: other.map(str::to_string),
        }),
    }
}
