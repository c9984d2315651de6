//! Transform program derivation from Type IR.
//!
//! Programs are derived structurally: every path from the type root to a value
//! needing conversion becomes a program ending in `this`, and every path to a
//! named type ends in `ref(name)`. Sibling continuations under one prefix are
//! grouped in a single `select`.

use oaskit_runtime::{TransformKind, TransformProgram, TransformStep};

use crate::ir::{PrimitiveKind, TypeIr};

/// Programs converting every `kind` value reachable from a `ty` root.
pub fn derive_programs(kind: TransformKind, ty: &TypeIr) -> Vec<TransformProgram> {
    match ty {
        TypeIr::Primitive {
            name: PrimitiveKind::String,
            format: Some(format),
        } if TransformKind::for_format(format) == Some(kind) => vec![TransformProgram::this()],
        TypeIr::Primitive { .. } | TypeIr::EnumLiteral { .. } | TypeIr::Literal { .. } => {
            Vec::new()
        }
        TypeIr::Array { element } => prefix(TransformStep::Loop, derive_programs(kind, element)),
        TypeIr::Object(object) => {
            let mut programs = Vec::new();
            for field in &object.fields {
                programs.extend(prefix(
                    TransformStep::Access(field.wire_name.clone()),
                    derive_programs(kind, &field.ty),
                ));
            }
            if let Some(additional) = &object.additional {
                programs.extend(prefix(
                    TransformStep::Entries,
                    derive_programs(kind, additional),
                ));
            }
            programs
        }
        TypeIr::Union { members, .. } | TypeIr::Intersection { members } => dedup(
            members
                .iter()
                .flat_map(|member| derive_programs(kind, member))
                .collect(),
        ),
        TypeIr::Reference { name } => vec![TransformProgram::reference(name.clone())],
    }
}

fn prefix(step: TransformStep, mut continuations: Vec<TransformProgram>) -> Vec<TransformProgram> {
    match continuations.len() {
        0 => Vec::new(),
        1 => continuations
            .pop()
            .map(|program| vec![program.prefixed(step)])
            .unwrap_or_default(),
        _ => vec![TransformProgram::new(vec![
            step,
            TransformStep::Select(continuations),
        ])],
    }
}

fn dedup(programs: Vec<TransformProgram>) -> Vec<TransformProgram> {
    let mut unique: Vec<TransformProgram> = Vec::with_capacity(programs.len());
    for program in programs {
        if !unique.contains(&program) {
            unique.push(program);
        }
    }
    unique
}
