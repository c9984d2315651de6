//! OpenAPI 3.x compiler for typed client declarations.
//!
//! The pipeline is:
//! 1. Parse: JSON/YAML -> `SpecDocument`
//! 2. Compile: `SpecDocument` -> Type IR, operation and security descriptors,
//!    plus the transform programs that convert dates and binary payloads
//! 3. Emit: `DeclarationList` -> text via a `DeclarationEmitter`
//!
//! The runtime half (transform interpreter, auth hook) lives in
//! `oaskit-runtime`.

pub mod compiler;
pub mod declarations;
pub mod emitter;
mod error;
pub mod ir;
pub mod options;
pub mod pipeline;
pub mod resolver;
pub mod spec;
pub mod utils;

pub use compiler::{AuthConfiguration, CompileContext, CompiledSchemas, NamedType};
pub use declarations::{ContextFactory, DeclarationKind, DeclarationList, TypeDeclaration};
pub use emitter::{DeclarationEmitter, JsonEmitter};
pub use error::{CompileError, Result};
pub use ir::Emit;
pub use options::{Casing, CompileOptions};
pub use pipeline::{compile_json, compile_spec, compile_yaml};
pub use resolver::Resolver;
pub use spec::SpecDocument;
