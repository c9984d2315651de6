//! Runtime support for oaskit generated clients.
//!
//! This crate holds everything a generated client needs after compilation:
//! - `Value`: payload tree with room for rich values (dates, binary)
//! - Transform Language: `TransformStep`/`TransformProgram` and the tables that
//!   `ref` steps resolve against
//! - Interpreter: `apply_transform` / `transform_payload`
//! - Built-in transformers for both payload directions
//! - Auth hook: `SecurityAuthentication` and the `AuthMethods` dispatcher

pub mod auth;
mod error;
pub mod interpreter;
pub mod transform;
pub mod transformers;
mod value;

pub use auth::{
    ApiKeyAuthConfig, ApiKeyLocation, AuthConfig, AuthMethods, AuthProvider, BasicAuthConfig,
    BearerAuthConfig, ConfigShape, RequestContext, RequestParts, SchemeKind,
    SecurityAuthentication, StaticProvider,
};
pub use error::AuthError;
pub use interpreter::{Interpreter, PathKey, ShapeMismatch, apply_transform, transform_payload};
pub use transform::{
    TransformKind, TransformProgram, TransformResolver, TransformStep, TransformTable,
    prune_programs,
};
pub use transformers::{Direction, ProgramSource, convert_payload, transformer_for};
pub use value::Value;
