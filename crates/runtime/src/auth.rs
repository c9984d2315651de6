//! Runtime authentication hook consumed by generated clients.
//!
//! Each security scheme kind has one [`SecurityAuthentication`] implementation
//! that injects credentials into a [`RequestContext`] before dispatch. The
//! [`AuthMethods`] dispatcher maps scheme names to configured implementations.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Mutable view of an outgoing request.
pub trait RequestContext {
    fn set_header_param(&mut self, name: &str, value: String);
    fn set_query_param(&mut self, name: &str, value: String);
    fn set_cookie_param(&mut self, name: &str, value: String);
}

/// In-memory request parameters, usable as a [`RequestContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParts {
    pub headers: IndexMap<String, String>,
    pub query: Vec<(String, String)>,
    pub cookies: IndexMap<String, String>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// `Cookie` header value built from the collected cookies.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl RequestContext for RequestParts {
    fn set_header_param(&mut self, name: &str, value: String) {
        self.headers.insert(name.to_string(), value);
    }

    fn set_query_param(&mut self, name: &str, value: String) {
        self.query.retain(|(k, _)| k != name);
        self.query.push((name.to_string(), value));
    }

    fn set_cookie_param(&mut self, name: &str, value: String) {
        self.cookies.insert(name.to_string(), value);
    }
}

/// Where an API key travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

/// A declared security scheme, reduced to what the runtime needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SchemeKind {
    /// `http` with `scheme: basic`
    HttpBasic,
    /// `http` with `scheme: bearer`
    HttpBearer {
        #[serde(skip_serializing_if = "Option::is_none")]
        bearer_format: Option<String>,
    },
    /// `apiKey`
    ApiKey {
        name: String,
        location: ApiKeyLocation,
    },
    /// `oauth2`, sent as a bearer token
    OAuth2,
    /// `openIdConnect`, sent as a bearer token
    OpenIdConnect { url: String },
}

impl SchemeKind {
    /// The configuration this scheme needs.
    pub fn config_shape(&self) -> ConfigShape {
        match self {
            SchemeKind::HttpBasic => ConfigShape::UsernamePassword,
            SchemeKind::HttpBearer { .. }
            | SchemeKind::OAuth2
            | SchemeKind::OpenIdConnect { .. } => ConfigShape::Token,
            SchemeKind::ApiKey { .. } => ConfigShape::Key,
        }
    }

    /// Build the authentication for this scheme from a static configuration.
    pub fn authenticate_with(
        &self,
        scheme: &str,
        config: AuthConfig,
    ) -> Result<Box<dyn SecurityAuthentication>, AuthError> {
        let mismatch = || AuthError::ConfigMismatch {
            scheme: scheme.to_string(),
            expected: self.config_shape().describe(),
        };
        Ok(match (self, config) {
            (SchemeKind::HttpBasic, AuthConfig::Basic(basic)) => {
                Box::new(HttpBasicAuthentication::new(Some(Arc::new(StaticProvider(basic)))))
            }
            (
                SchemeKind::HttpBearer { .. }
                | SchemeKind::OAuth2
                | SchemeKind::OpenIdConnect { .. },
                AuthConfig::Bearer(bearer),
            ) => Box::new(HttpBearerAuthentication::new(Some(Arc::new(StaticProvider(bearer))))),
            (SchemeKind::ApiKey { name, location }, AuthConfig::ApiKey(key)) => {
                Box::new(ApiKeyAuthentication::new(
                    name.clone(),
                    *location,
                    Some(Arc::new(StaticProvider(key))),
                ))
            }
            _ => return Err(mismatch()),
        })
    }
}

/// Configuration shape required by a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigShape {
    UsernamePassword,
    Token,
    Key,
}

impl ConfigShape {
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            ConfigShape::UsernamePassword => &["username", "password"],
            ConfigShape::Token => &["token"],
            ConfigShape::Key => &["key"],
        }
    }

    fn describe(&self) -> String {
        self.fields()
            .iter()
            .map(|f| format!("`{f}`"))
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerAuthConfig {
    pub token: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyAuthConfig {
    pub key: String,
}

macro_rules! redacted_debug {
    ($($ty:ident),*) => {
        $(impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($ty), " { .. }"))
            }
        })*
    };
}

redacted_debug!(BasicAuthConfig, BearerAuthConfig, ApiKeyAuthConfig);

/// Configuration for one scheme, in any supported shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthConfig {
    Basic(BasicAuthConfig),
    Bearer(BearerAuthConfig),
    ApiKey(ApiKeyAuthConfig),
}

/// Supplies configuration when a request is authenticated.
pub trait AuthProvider<C>: Send + Sync {
    fn config(&self) -> Result<C, AuthError>;
}

/// Provider returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticProvider<C>(pub C);

impl<C: Clone + Send + Sync> AuthProvider<C> for StaticProvider<C> {
    fn config(&self) -> Result<C, AuthError> {
        Ok(self.0.clone())
    }
}

impl<C, F> AuthProvider<C> for F
where
    F: Fn() -> Result<C, AuthError> + Send + Sync,
{
    fn config(&self) -> Result<C, AuthError> {
        self()
    }
}

/// Installs the per-request authentication side effect.
pub trait SecurityAuthentication: fmt::Debug + Send + Sync {
    fn apply_security_authentication(
        &self,
        context: &mut dyn RequestContext,
    ) -> Result<(), AuthError>;
}

type Provider<C> = Option<Arc<dyn AuthProvider<C>>>;

pub struct HttpBasicAuthentication {
    provider: Provider<BasicAuthConfig>,
}

impl HttpBasicAuthentication {
    pub fn new(provider: Provider<BasicAuthConfig>) -> Self {
        Self { provider }
    }
}

impl SecurityAuthentication for HttpBasicAuthentication {
    fn apply_security_authentication(
        &self,
        context: &mut dyn RequestContext,
    ) -> Result<(), AuthError> {
        let Some(provider) = &self.provider else {
            return Ok(());
        };
        let BasicAuthConfig { username, password } = provider.config()?;
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        context.set_header_param("Authorization", format!("Basic {encoded}"));
        Ok(())
    }
}

pub struct HttpBearerAuthentication {
    provider: Provider<BearerAuthConfig>,
}

impl HttpBearerAuthentication {
    pub fn new(provider: Provider<BearerAuthConfig>) -> Self {
        Self { provider }
    }
}

impl SecurityAuthentication for HttpBearerAuthentication {
    fn apply_security_authentication(
        &self,
        context: &mut dyn RequestContext,
    ) -> Result<(), AuthError> {
        let Some(provider) = &self.provider else {
            return Ok(());
        };
        let BearerAuthConfig { token } = provider.config()?;
        context.set_header_param("Authorization", format!("Bearer {token}"));
        Ok(())
    }
}

pub struct ApiKeyAuthentication {
    name: String,
    location: ApiKeyLocation,
    provider: Provider<ApiKeyAuthConfig>,
}

impl ApiKeyAuthentication {
    pub fn new(
        name: String,
        location: ApiKeyLocation,
        provider: Provider<ApiKeyAuthConfig>,
    ) -> Self {
        Self {
            name,
            location,
            provider,
        }
    }
}

impl SecurityAuthentication for ApiKeyAuthentication {
    fn apply_security_authentication(
        &self,
        context: &mut dyn RequestContext,
    ) -> Result<(), AuthError> {
        let Some(provider) = &self.provider else {
            return Ok(());
        };
        let ApiKeyAuthConfig { key } = provider.config()?;
        match self.location {
            ApiKeyLocation::Header => context.set_header_param(&self.name, key),
            ApiKeyLocation::Query => context.set_query_param(&self.name, key),
            ApiKeyLocation::Cookie => context.set_cookie_param(&self.name, key),
        }
        Ok(())
    }
}

impl fmt::Debug for HttpBasicAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBasicAuthentication")
            .field("configured", &self.provider.is_some())
            .finish()
    }
}

impl fmt::Debug for HttpBearerAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBearerAuthentication")
            .field("configured", &self.provider.is_some())
            .finish()
    }
}

impl fmt::Debug for ApiKeyAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuthentication")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("configured", &self.provider.is_some())
            .finish()
    }
}

/// Configured authentication methods, keyed by scheme name.
#[derive(Debug, Default)]
pub struct AuthMethods {
    methods: IndexMap<String, Box<dyn SecurityAuthentication>>,
}

impl AuthMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scheme: impl Into<String>, method: Box<dyn SecurityAuthentication>) {
        self.methods.insert(scheme.into(), method);
    }

    pub fn get(&self, scheme: &str) -> Option<&dyn SecurityAuthentication> {
        self.methods.get(scheme).map(Box::as_ref)
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.methods.contains_key(scheme)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Apply the selected scheme to a request.
    pub fn apply(&self, scheme: &str, context: &mut dyn RequestContext) -> Result<(), AuthError> {
        let method = self
            .get(scheme)
            .ok_or_else(|| AuthError::UnknownScheme(scheme.to_string()))?;
        method.apply_security_authentication(context)
    }

    /// Apply the first requirement whose schemes are all configured.
    ///
    /// Requirements are alternatives; the schemes inside one requirement all
    /// apply. Nothing happens when no requirement can be satisfied.
    pub fn apply_requirements(
        &self,
        requirements: &[Vec<String>],
        context: &mut dyn RequestContext,
    ) -> Result<(), AuthError> {
        let Some(selected) = requirements
            .iter()
            .find(|schemes| schemes.iter().all(|s| self.contains(s)))
        else {
            debug!(
                requirements = requirements.len(),
                "No configured security requirement for request."
            );
            return Ok(());
        };
        for scheme in selected {
            self.apply(scheme, context)?;
        }
        Ok(())
    }
}
