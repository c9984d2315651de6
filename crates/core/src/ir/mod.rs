//! Intermediate representation produced by the compilers.
//!
//! - `types`: Type IR (primitives, arrays, objects, unions, enums, references)
//! - `api`: operation, parameter, body/response and security descriptors
//! - `emit`: signature notation via the `Emit` trait

mod api;
mod emit;
mod types;

pub use api::{
    BodyBinding, BodyContentType, OperationDescriptor, ParameterBinding, PathPart,
    ResponseBinding, ResponseContentType, SecurityDescriptor, TransformLinks,
};
pub use emit::Emit;
pub use types::{Discriminator, Field, LiteralValue, ObjectType, PrimitiveKind, TypeIr};
