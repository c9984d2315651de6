//! Operation and security descriptors.

use std::collections::{BTreeMap, HashSet};

use oaskit_runtime::{
    ConfigShape, ProgramSource, SchemeKind, TransformKind, TransformProgram, prune_programs,
};
use serde::Serialize;

use super::types::TypeIr;
use crate::spec::{HttpMethod, ParameterLocation, SecurityRequirement};

/// Transform programs linked to a request or response payload, by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TransformLinks {
    programs: BTreeMap<TransformKind, Vec<TransformProgram>>,
}

impl TransformLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store programs for `kind`; empty lists are dropped.
    pub fn insert(&mut self, kind: TransformKind, programs: Vec<TransformProgram>) {
        if programs.is_empty() {
            self.programs.remove(&kind);
        } else {
            self.programs.insert(kind, programs);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Keep only programs that reach a live schema or a `this` step.
    pub fn prune(&mut self, live: &BTreeMap<TransformKind, HashSet<String>>) {
        let empty = HashSet::new();
        for (kind, programs) in &mut self.programs {
            let live = live.get(kind).unwrap_or(&empty);
            *programs = prune_programs(std::mem::take(programs), live);
        }
        self.programs.retain(|_, programs| !programs.is_empty());
    }
}

impl ProgramSource for TransformLinks {
    fn programs(&self, kind: TransformKind) -> &[TransformProgram] {
        self.programs
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Parameter with its reference (if any) resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterBinding {
    /// Normalized identifier
    pub name: String,
    pub wire_name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub ty: TypeIr,
}

/// Request body encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyContentType {
    Json,
    FormData,
    UrlEncoded,
    Other,
}

impl BodyContentType {
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = essence(media_type);
        let media_type = media_type.as_str();
        if is_json(media_type) {
            BodyContentType::Json
        } else if media_type == "multipart/form-data" {
            BodyContentType::FormData
        } else if media_type == "application/x-www-form-urlencoded" {
            BodyContentType::UrlEncoded
        } else {
            BodyContentType::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyBinding {
    pub media_type: String,
    pub content_type: BodyContentType,
    pub required: bool,
    pub ty: TypeIr,
    #[serde(skip_serializing_if = "TransformLinks::is_empty")]
    pub transforms: TransformLinks,
}

/// Response payload classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseContentType {
    Json,
    Text,
    Binary,
    Unknown,
}

impl ResponseContentType {
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = essence(media_type);
        let media_type = media_type.as_str();
        if is_json(media_type) {
            ResponseContentType::Json
        } else if media_type.starts_with("text/")
            || media_type == "application/xml"
            || media_type.ends_with("+xml")
        {
            ResponseContentType::Text
        } else if media_type == "application/octet-stream"
            || media_type.starts_with("image/")
            || media_type.starts_with("audio/")
            || media_type.starts_with("video/")
            || media_type == "application/pdf"
        {
            ResponseContentType::Binary
        } else {
            ResponseContentType::Unknown
        }
    }
}

/// `type/subtype` without parameters, lowercased.
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_json(essence: &str) -> bool {
    essence.ends_with("/json") || essence.ends_with("+json")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBinding {
    /// Status code, `2XX`-style range or `default`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ResponseContentType>,
    /// `None` when the response has no body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeIr>,
    #[serde(skip_serializing_if = "TransformLinks::is_empty")]
    pub transforms: TransformLinks,
}

/// Static or parameter segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PathPart {
    Static(String),
    Param(String),
}

/// One callable operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub name: String,
    pub method: HttpMethod,
    /// URL template, e.g. `/items/{itemId}`
    pub path: String,
    pub path_parts: Vec<PathPart>,
    pub parameters: Vec<ParameterBinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyBinding>,
    pub responses: Vec<ResponseBinding>,
    /// Alternatives; every scheme of the chosen requirement applies.
    pub security: Vec<SecurityRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

/// Success statuses in the order a client prefers them.
const SUCCESS_STATUSES: [&str; 8] = ["200", "201", "202", "203", "206", "207", "2XX", "default"];

impl OperationDescriptor {
    /// The response a client treats as the result.
    pub fn success_response(&self) -> Option<&ResponseBinding> {
        SUCCESS_STATUSES
            .iter()
            .find_map(|status| self.response(status))
    }

    pub fn response(&self, status: &str) -> Option<&ResponseBinding> {
        self.responses
            .iter()
            .find(|r| r.status.eq_ignore_ascii_case(status))
    }

    pub fn parameter(
        &self,
        location: ParameterLocation,
        wire_name: &str,
    ) -> Option<&ParameterBinding> {
        self.parameters
            .iter()
            .find(|p| p.location == location && p.wire_name == wire_name)
    }

    /// Scheme names of each security requirement, in declaration order.
    pub fn security_schemes(&self) -> Vec<Vec<String>> {
        self.security
            .iter()
            .map(|requirement| requirement.keys().cloned().collect())
            .collect()
    }
}

/// A supported security scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDescriptor {
    pub name: String,
    pub kind: SchemeKind,
    pub config_shape: ConfigShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
