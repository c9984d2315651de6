//! Security Compiler: declared schemes to auth descriptors.

use indexmap::IndexMap;
use oaskit_runtime::{ApiKeyLocation, AuthConfig, AuthError, AuthMethods, SchemeKind};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CompileError, Result};
use crate::ir::SecurityDescriptor;
use crate::resolver::{DefinitionKind, Resolver};
use crate::spec::{RefOr, SecurityScheme, SpecDocument};

/// Supported security schemes of a document, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuthConfiguration {
    schemes: Vec<SecurityDescriptor>,
}

impl AuthConfiguration {
    pub fn schemes(&self) -> &[SecurityDescriptor] {
        &self.schemes
    }

    pub fn scheme(&self, name: &str) -> Option<&SecurityDescriptor> {
        self.schemes.iter().find(|s| s.name == name)
    }

    pub fn scheme_names(&self) -> Vec<String> {
        self.schemes.iter().map(|s| s.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    /// Merge per-scheme configuration into a request-time dispatcher.
    ///
    /// Every configured name must be a declared scheme and its configuration
    /// must have the scheme's shape. Schemes left unconfigured are simply not
    /// available to the dispatcher.
    pub fn configure(
        &self,
        configs: IndexMap<String, AuthConfig>,
    ) -> std::result::Result<AuthMethods, AuthError> {
        let mut methods = AuthMethods::new();
        for (name, config) in configs {
            let descriptor = self
                .scheme(&name)
                .ok_or_else(|| AuthError::UnknownScheme(name.clone()))?;
            let method = descriptor.kind.authenticate_with(&name, config)?;
            debug!(scheme = %name, "Configured security scheme.");
            methods.insert(name, method);
        }
        Ok(methods)
    }

    /// Like [`configure`](Self::configure), but every declared scheme must
    /// be configured.
    pub fn configure_all(
        &self,
        mut configs: IndexMap<String, AuthConfig>,
    ) -> std::result::Result<AuthMethods, AuthError> {
        if let Some(missing) = self
            .schemes
            .iter()
            .find(|s| !configs.contains_key(&s.name))
        {
            return Err(AuthError::MissingConfig(missing.name.clone()));
        }
        configs.retain(|name, _| self.scheme(name).is_some());
        self.configure(configs)
    }
}

/// Map every declared security scheme to a descriptor.
///
/// Unsupported schemes are skipped with a warning; an `apiKey` scheme without
/// a usable name or location is invalid.
pub fn compile_security(resolver: &Resolver<'_>, doc: &SpecDocument) -> Result<AuthConfiguration> {
    let mut schemes = Vec::new();
    for (name, scheme) in &doc.components.security_schemes {
        let pointer = DefinitionKind::SecurityScheme.pointer(name);
        let scheme = match scheme {
            RefOr::Item(scheme) => scheme,
            RefOr::Ref(reference) => match resolver.security_scheme(&reference.ref_path)? {
                RefOr::Item(scheme) => scheme,
                RefOr::Ref(_) => {
                    return Err(CompileError::invalid(
                        reference.ref_path.clone(),
                        "security scheme reference points at another reference",
                    ));
                }
            },
        };
        let Some(kind) = scheme_kind(scheme, &pointer)? else {
            continue;
        };
        schemes.push(SecurityDescriptor {
            name: name.clone(),
            config_shape: kind.config_shape(),
            kind,
            description: scheme.description.clone(),
        });
    }
    Ok(AuthConfiguration { schemes })
}

fn scheme_kind(scheme: &SecurityScheme, pointer: &str) -> Result<Option<SchemeKind>> {
    let kind = match scheme.scheme_type.as_str() {
        "http" => match scheme.scheme.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("basic") => SchemeKind::HttpBasic,
            Some("bearer") => SchemeKind::HttpBearer {
                bearer_format: scheme.bearer_format.clone(),
            },
            other => {
                warn!(
                    scheme = %pointer,
                    http_scheme = ?other,
                    "Skipping unsupported HTTP auth scheme."
                );
                return Ok(None);
            }
        },
        "apiKey" => {
            let name = scheme
                .name
                .clone()
                .ok_or_else(|| CompileError::invalid(pointer, "apiKey scheme has no `name`"))?;
            let location = match scheme.location.as_deref() {
                Some("header") => ApiKeyLocation::Header,
                Some("query") => ApiKeyLocation::Query,
                Some("cookie") => ApiKeyLocation::Cookie,
                other => {
                    return Err(CompileError::invalid(
                        pointer,
                        format!("apiKey scheme has unsupported location {other:?}"),
                    ));
                }
            };
            SchemeKind::ApiKey { name, location }
        }
        "oauth2" => SchemeKind::OAuth2,
        "openIdConnect" => SchemeKind::OpenIdConnect {
            url: scheme.open_id_connect_url.clone().unwrap_or_default(),
        },
        other => {
            warn!(
                scheme = %pointer,
                scheme_type = other,
                "Skipping unsupported security scheme type."
            );
            return Ok(None);
        }
    };
    Ok(Some(kind))
}
