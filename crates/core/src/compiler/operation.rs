//! Operation Compiler: one descriptor per path and verb.

use std::collections::HashSet;

use indexmap::IndexMap;
use oaskit_runtime::TransformKind;
use tracing::debug;

use super::{CompileContext, derive_programs};
use crate::error::{CompileError, Result};
use crate::ir::{
    BodyBinding, BodyContentType, OperationDescriptor, ParameterBinding, PathPart, PrimitiveKind,
    ResponseBinding, ResponseContentType, TransformLinks, TypeIr,
};
use crate::resolver::Resolver;
use crate::spec::{
    HttpMethod, MediaType, Operation, Parameter, ParameterLocation, PathItem, RefOr, SpecDocument,
};
use super::schema::claim_field_name;
use crate::utils::{pointer_join, sanitize_identifier, to_camel_identifier};

/// Compile every declared operation, in document order.
pub fn compile_operations(
    ctx: &mut CompileContext<'_>,
    doc: &SpecDocument,
) -> Result<Vec<OperationDescriptor>> {
    let mut operations = Vec::new();
    let mut names = HashSet::new();

    for (path, item) in &doc.paths {
        let path_pointer = pointer_join("#/paths", path);
        for (method, op) in item.operations() {
            let name = operation_name(path, method, op);
            if !names.insert(name.clone()) {
                return Err(CompileError::DuplicateOperationId(name));
            }
            let pointer = pointer_join(&path_pointer, method.key());
            debug!(
                operation = %name,
                method = method.as_str(),
                path = %path,
                "Compiling operation."
            );

            let parameters = compile_parameters(ctx, item, op, &path_pointer, &pointer)?;
            let body = compile_body(ctx, op, &pointer)?;
            let responses = compile_responses(ctx, op, &pointer)?;
            let security = op
                .security
                .as_ref()
                .or(doc.security.as_ref())
                .cloned()
                .unwrap_or_default();

            operations.push(OperationDescriptor {
                name,
                method,
                path: path.clone(),
                path_parts: parse_path_template(path),
                parameters,
                body,
                responses,
                security,
                summary: op.summary.clone(),
                description: op.description.clone(),
                deprecated: op.deprecated,
            });
        }
    }
    Ok(operations)
}

/// Sanitized `operationId`, else derived from the verb and path segments.
fn operation_name(path: &str, method: HttpMethod, op: &Operation) -> String {
    if let Some(id) = &op.operation_id {
        return sanitize_identifier(id);
    }
    let words: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(param) => format!("by {param}"),
            None => segment.to_string(),
        })
        .collect();
    to_camel_identifier(&format!("{} {}", method.key(), words.join(" ")))
}

/// Split `/items/{itemId}` into static and parameter parts.
pub fn parse_path_template(path: &str) -> Vec<PathPart> {
    let mut parts = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        if start > 0 {
            parts.push(PathPart::Static(rest[..start].to_string()));
        }
        parts.push(PathPart::Param(rest[start + 1..start + len].to_string()));
        rest = &rest[start + len + 1..];
    }
    if !rest.is_empty() {
        parts.push(PathPart::Static(rest.to_string()));
    }
    parts
}

/// Path-level parameters, overridden by operation-level ones with the same
/// location and wire name.
fn compile_parameters(
    ctx: &mut CompileContext<'_>,
    item: &PathItem,
    op: &Operation,
    path_pointer: &str,
    op_pointer: &str,
) -> Result<Vec<ParameterBinding>> {
    let mut bindings = compile_parameter_list(ctx, &item.parameters, path_pointer)?;
    for binding in compile_parameter_list(ctx, &op.parameters, op_pointer)? {
        bindings.retain(|b| !(b.location == binding.location && b.wire_name == binding.wire_name));
        bindings.push(binding);
    }
    // a query `user_id` and a header `user-id` both case to `userId`
    let mut used = HashSet::new();
    for binding in &mut bindings {
        let name = std::mem::take(&mut binding.name);
        binding.name = claim_field_name(&mut used, name, &binding.wire_name);
    }
    Ok(bindings)
}

fn compile_parameter_list(
    ctx: &mut CompileContext<'_>,
    params: &[RefOr<Parameter>],
    pointer: &str,
) -> Result<Vec<ParameterBinding>> {
    let base = pointer_join(pointer, "parameters");
    let mut seen = HashSet::new();
    let mut bindings = Vec::with_capacity(params.len());
    for (i, param) in params.iter().enumerate() {
        let (param, param_pointer) =
            resolve_one_level(ctx.resolver(), param, pointer_join(&base, &i.to_string()))?;
        if !seen.insert((param.location, param.name.as_str())) {
            return Err(CompileError::DuplicateParameter {
                location: param.location.as_str().to_string(),
                name: param.name.clone(),
            });
        }
        bindings.push(bind_parameter(ctx, param, &param_pointer)?);
    }
    Ok(bindings)
}

/// Follow exactly one level of parameter reference.
fn resolve_one_level<'p>(
    resolver: &Resolver<'p>,
    param: &'p RefOr<Parameter>,
    pointer: String,
) -> Result<(&'p Parameter, String)> {
    match param {
        RefOr::Item(param) => Ok((param, pointer)),
        RefOr::Ref(reference) => match resolver.parameter(&reference.ref_path)? {
            RefOr::Item(param) => Ok((param, reference.ref_path.clone())),
            RefOr::Ref(_) => Err(CompileError::invalid(
                reference.ref_path.clone(),
                "parameter reference points at another reference",
            )),
        },
    }
}

fn bind_parameter(
    ctx: &mut CompileContext<'_>,
    param: &Parameter,
    pointer: &str,
) -> Result<ParameterBinding> {
    let ty = match &param.schema {
        Some(node) => ctx.compile(node, &pointer_join(pointer, "schema"))?,
        None => TypeIr::primitive(PrimitiveKind::String),
    };
    Ok(ParameterBinding {
        name: ctx.options().field_casing.apply(&param.name),
        wire_name: param.name.clone(),
        location: param.location,
        required: param.required || param.location == ParameterLocation::Path,
        ty,
    })
}

fn compile_body(
    ctx: &mut CompileContext<'_>,
    op: &Operation,
    op_pointer: &str,
) -> Result<Option<BodyBinding>> {
    let Some(body) = &op.request_body else {
        return Ok(None);
    };
    let (body, pointer) = match body {
        RefOr::Item(body) => (body, pointer_join(op_pointer, "requestBody")),
        RefOr::Ref(reference) => match ctx.resolver().request_body(&reference.ref_path)? {
            RefOr::Item(body) => (body, reference.ref_path.clone()),
            RefOr::Ref(_) => {
                return Err(CompileError::invalid(
                    reference.ref_path.clone(),
                    "request body reference points at another reference",
                ));
            }
        },
    };
    let Some((media_type, media)) = pick_body_media(&body.content) else {
        return Ok(None);
    };
    let ty = compile_media(ctx, media, &pointer, media_type)?;
    Ok(Some(BodyBinding {
        media_type: media_type.clone(),
        content_type: BodyContentType::from_media_type(media_type),
        required: body.required,
        transforms: transform_links(&ty),
        ty,
    }))
}

/// JSON first, then multipart, then url-encoded, then whatever is declared first.
fn pick_body_media(content: &IndexMap<String, MediaType>) -> Option<(&String, &MediaType)> {
    let by_type = |wanted: BodyContentType| {
        content
            .iter()
            .find(|(media_type, _)| BodyContentType::from_media_type(media_type) == wanted)
    };
    by_type(BodyContentType::Json)
        .or_else(|| by_type(BodyContentType::FormData))
        .or_else(|| by_type(BodyContentType::UrlEncoded))
        .or_else(|| content.first())
}

fn compile_responses(
    ctx: &mut CompileContext<'_>,
    op: &Operation,
    op_pointer: &str,
) -> Result<Vec<ResponseBinding>> {
    let responses_pointer = pointer_join(op_pointer, "responses");
    let mut bindings = Vec::with_capacity(op.responses.len());
    for (status, response) in &op.responses {
        let (response, pointer) = match response {
            RefOr::Item(response) => (response, pointer_join(&responses_pointer, status)),
            RefOr::Ref(reference) => match ctx.resolver().response(&reference.ref_path)? {
                RefOr::Item(response) => (response, reference.ref_path.clone()),
                RefOr::Ref(_) => {
                    return Err(CompileError::invalid(
                        reference.ref_path.clone(),
                        "response reference points at another reference",
                    ));
                }
            },
        };

        let media = response
            .content
            .iter()
            .find(|(media_type, _)| {
                ResponseContentType::from_media_type(media_type) == ResponseContentType::Json
            })
            .or_else(|| response.content.first());
        let binding = match media {
            Some((media_type, media)) => {
                let ty = compile_media(ctx, media, &pointer, media_type)?;
                ResponseBinding {
                    status: status.clone(),
                    media_type: Some(media_type.clone()),
                    content_type: Some(ResponseContentType::from_media_type(media_type)),
                    transforms: transform_links(&ty),
                    ty: Some(ty),
                }
            }
            None => ResponseBinding {
                status: status.clone(),
                media_type: None,
                content_type: None,
                ty: None,
                transforms: TransformLinks::new(),
            },
        };
        bindings.push(binding);
    }
    Ok(bindings)
}

fn compile_media(
    ctx: &mut CompileContext<'_>,
    media: &MediaType,
    pointer: &str,
    media_type: &str,
) -> Result<TypeIr> {
    match &media.schema {
        Some(node) => {
            let content = pointer_join(&pointer_join(pointer, "content"), media_type);
            ctx.compile(node, &pointer_join(&content, "schema"))
        }
        None => Ok(TypeIr::any()),
    }
}

fn transform_links(ty: &TypeIr) -> TransformLinks {
    let mut links = TransformLinks::new();
    for kind in TransformKind::ALL {
        links.insert(kind, derive_programs(kind, ty));
    }
    links
}
