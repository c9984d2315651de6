//! Tree-walking interpreter for transform programs.
//!
//! Steps are dispatched purely on the runtime shape of the payload. A step whose
//! shape precondition fails is a no-op; the interpreter never fails and never
//! allocates replacement containers, it mutates the payload in place.

use std::fmt;

use crate::transform::{TransformKind, TransformProgram, TransformResolver, TransformStep};
use crate::value::Value;

/// Addresses a slot inside its container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    /// Field of a keyed structure
    Field(String),
    /// Element of a sequence
    Index(usize),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Field(name) => write!(f, ".{name}"),
            PathKey::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for PathKey {
    fn from(value: &str) -> Self {
        PathKey::Field(value.to_string())
    }
}

impl From<usize> for PathKey {
    fn from(value: usize) -> Self {
        PathKey::Index(value)
    }
}

/// A present value whose shape did not satisfy a step's precondition.
///
/// Only recorded in strict mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// Path from the payload root, e.g. `$.items[2].createdAt`
    pub path: String,
    /// Step that expected another shape
    pub step: &'static str,
    /// Shape actually found
    pub found: &'static str,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` step expected another shape at {}, found {}",
            self.step, self.path, self.found
        )
    }
}

/// Interpreter state for one transform kind.
pub struct Interpreter<'a, R: ?Sized> {
    resolver: &'a R,
    kind: TransformKind,
    mismatches: Option<Vec<ShapeMismatch>>,
    path: Vec<PathKey>,
}

impl<R: ?Sized> fmt::Debug for Interpreter<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("kind", &self.kind)
            .field("strict", &self.mismatches.is_some())
            .finish()
    }
}

impl<'a, R: TransformResolver + ?Sized> Interpreter<'a, R> {
    pub fn new(resolver: &'a R, kind: TransformKind) -> Self {
        Self {
            resolver,
            kind,
            mismatches: None,
            path: Vec::new(),
        }
    }

    /// Record shape mismatches instead of skipping them silently.
    pub fn strict(mut self) -> Self {
        self.mismatches = Some(Vec::new());
        self
    }

    /// Mismatches recorded so far (always empty outside strict mode).
    pub fn mismatches(&self) -> &[ShapeMismatch] {
        self.mismatches.as_deref().unwrap_or(&[])
    }

    pub fn into_mismatches(self) -> Vec<ShapeMismatch> {
        self.mismatches.unwrap_or_default()
    }

    /// Run `program` from step `index` against `container[key]`.
    pub fn run<F>(
        &mut self,
        container: &mut Value,
        key: &PathKey,
        transform: &mut F,
        program: &TransformProgram,
        index: usize,
    ) where
        F: FnMut(Value) -> Value,
    {
        let Some(slot) = slot_mut(container, key) else {
            return;
        };
        self.path.push(key.clone());
        let mut active = Vec::new();
        self.run_slot(slot, transform, program, index, &mut active);
        self.path.pop();
    }

    /// Run every program in `programs` against a root payload.
    pub fn run_root<F>(
        &mut self,
        payload: &mut Value,
        transform: &mut F,
        programs: &[TransformProgram],
    ) where
        F: FnMut(Value) -> Value,
    {
        for program in programs {
            let mut active = Vec::new();
            self.run_slot(payload, transform, program, 0, &mut active);
        }
    }

    /// `active` holds the `ref` names entered at this slot since the last descent.
    fn run_slot<F>(
        &mut self,
        slot: &mut Value,
        transform: &mut F,
        program: &TransformProgram,
        index: usize,
        active: &mut Vec<String>,
    ) where
        F: FnMut(Value) -> Value,
    {
        let Some(step) = program.step(index) else {
            return;
        };
        match step {
            TransformStep::This => {
                let value = std::mem::take(slot);
                *slot = transform(value);
            }
            TransformStep::Access(field) => {
                let Value::Object(map) = slot else {
                    self.mismatch(step, slot);
                    return;
                };
                let Some(child) = map.get_mut(field) else {
                    return;
                };
                self.path.push(PathKey::Field(field.clone()));
                self.run_slot(child, transform, program, index + 1, &mut Vec::new());
                self.path.pop();
            }
            TransformStep::Loop => {
                let Value::Array(items) = slot else {
                    self.mismatch(step, slot);
                    return;
                };
                for (i, item) in items.iter_mut().enumerate() {
                    self.path.push(PathKey::Index(i));
                    self.run_slot(item, transform, program, index + 1, &mut Vec::new());
                    self.path.pop();
                }
            }
            TransformStep::Entries => {
                let Value::Object(map) = slot else {
                    self.mismatch(step, slot);
                    return;
                };
                for (name, value) in map.iter_mut() {
                    self.path.push(PathKey::Field(name.clone()));
                    self.run_slot(value, transform, program, index + 1, &mut Vec::new());
                    self.path.pop();
                }
            }
            TransformStep::Select(programs) => {
                for sub in programs {
                    self.run_slot(slot, transform, sub, 0, active);
                }
            }
            TransformStep::Ref(name) => {
                if active.iter().any(|entered| entered == name) {
                    return;
                }
                active.push(name.clone());
                let resolver = self.resolver;
                for sub in resolver.get_transforms(self.kind, name) {
                    self.run_slot(slot, transform, sub, 0, active);
                }
                active.pop();
            }
        }
    }

    fn mismatch(&mut self, step: &TransformStep, found: &Value) {
        if found.is_null() {
            return;
        }
        let path = self.render_path();
        if let Some(mismatches) = self.mismatches.as_mut() {
            mismatches.push(ShapeMismatch {
                path,
                step: step.name(),
                found: found.type_name(),
            });
        }
    }

    fn render_path(&self) -> String {
        let mut out = String::from("$");
        for key in &self.path {
            out.push_str(&key.to_string());
        }
        out
    }
}

fn slot_mut<'v>(container: &'v mut Value, key: &PathKey) -> Option<&'v mut Value> {
    match (container, key) {
        (Value::Object(map), PathKey::Field(name)) => map.get_mut(name),
        (Value::Array(items), PathKey::Index(i)) => items.get_mut(*i),
        _ => None,
    }
}

/// Apply `program` from step `index` to `container[key]`, mutating in place.
///
/// `container` must own `key` for anything to happen; a missing key or a shape
/// that does not fit a step leaves the payload untouched.
pub fn apply_transform<R, F>(
    resolver: &R,
    container: &mut Value,
    key: &PathKey,
    kind: TransformKind,
    transform: &mut F,
    program: &TransformProgram,
    index: usize,
) where
    R: TransformResolver + ?Sized,
    F: FnMut(Value) -> Value,
{
    Interpreter::new(resolver, kind).run(container, key, transform, program, index);
}

/// Apply a program set to a whole payload.
pub fn transform_payload<R, F>(
    resolver: &R,
    payload: &mut Value,
    kind: TransformKind,
    mut transform: F,
    programs: &[TransformProgram],
) where
    R: TransformResolver + ?Sized,
    F: FnMut(Value) -> Value,
{
    Interpreter::new(resolver, kind).run_root(payload, &mut transform, programs);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transform::TransformTable;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn access(key: &str) -> TransformStep {
        TransformStep::Access(key.to_string())
    }

    fn program(steps: Vec<TransformStep>) -> TransformProgram {
        TransformProgram::new(steps)
    }

    fn mark(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(format!("<{s}>")),
            other => other,
        }
    }

    fn run_root(
        table: &TransformTable,
        payload: serde_json::Value,
        programs: &[TransformProgram],
    ) -> serde_json::Value {
        let mut value = Value::from(payload);
        transform_payload(table, &mut value, TransformKind::Date, mark, programs);
        value.into_json()
    }

    /// `this` at `container[key]`, starting at step `index`.
    fn apply_this<F>(container: &mut Value, key: &str, transform: &mut F, index: usize)
    where
        F: FnMut(Value) -> Value,
    {
        let table = TransformTable::new();
        let program = TransformProgram::this();
        let key = PathKey::from(key);
        apply_transform(&table, container, &key, TransformKind::Date, transform, &program, index);
    }

    #[test]
    fn test_this_replaces_existing_key() {
        let mut container = Value::from(json!({ "a": "x", "b": "y" }));
        apply_this(&mut container, "a", &mut mark, 0);
        assert_eq!(container.into_json(), json!({ "a": "<x>", "b": "y" }));
    }

    #[test]
    fn test_this_checks_existence_not_truthiness() {
        let mut calls = 0;
        let mut counting = |v: Value| {
            calls += 1;
            v
        };
        let mut container = Value::from(json!({ "a": null }));
        apply_this(&mut container, "a", &mut counting, 0);
        apply_this(&mut container, "missing", &mut counting, 0);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_access_descends_and_skips_non_objects() {
        let table = TransformTable::new();
        let programs = [program(vec![access("inner"), access("at"), TransformStep::This])];
        assert_eq!(
            run_root(&table, json!({ "inner": { "at": "t", "other": "o" } }), &programs),
            json!({ "inner": { "at": "<t>", "other": "o" } })
        );
        assert_eq!(
            run_root(&table, json!({ "inner": ["t"] }), &programs),
            json!({ "inner": ["t"] })
        );
        assert_eq!(run_root(&table, json!({}), &programs), json!({}));
    }

    #[test]
    fn test_loop_transforms_every_element() {
        let table = TransformTable::new();
        let programs = [program(vec![
            access("items"),
            TransformStep::Loop,
            access("at"),
            TransformStep::This,
        ])];
        let out = run_root(
            &table,
            json!({ "items": [{ "at": "1" }, { "id": 2 }, { "at": "3" }] }),
            &programs,
        );
        assert_eq!(out, json!({ "items": [{ "at": "<1>" }, { "id": 2 }, { "at": "<3>" }] }));
    }

    #[test]
    fn test_loop_on_non_sequence_is_noop() {
        let table = TransformTable::new();
        let programs = [program(vec![access("items"), TransformStep::Loop, TransformStep::This])];
        assert_eq!(run_root(&table, json!({ "items": "x" }), &programs), json!({ "items": "x" }));
    }

    #[test]
    fn test_entries_preserves_keys() {
        let table = TransformTable::new();
        let programs = [program(vec![TransformStep::Entries, TransformStep::This])];
        let out = run_root(&table, json!({ "z": "1", "a": "2" }), &programs);
        assert_eq!(out, json!({ "z": "<1>", "a": "<2>" }));
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_entries_skips_sequences() {
        let table = TransformTable::new();
        let programs = [program(vec![TransformStep::Entries, TransformStep::This])];
        assert_eq!(run_root(&table, json!(["1", "2"]), &programs), json!(["1", "2"]));
    }

    #[test]
    fn test_select_fans_out_on_same_slot() {
        let table = TransformTable::new();
        let programs = [program(vec![
            access("pair"),
            TransformStep::Select(vec![
                program(vec![access("left"), TransformStep::This]),
                program(vec![access("right"), TransformStep::This]),
            ]),
        ])];
        let payload = json!({ "pair": { "left": "l", "right": "r", "mid": "m" } });
        let out = run_root(&table, payload, &programs);
        assert_eq!(out, json!({ "pair": { "left": "<l>", "right": "<r>", "mid": "m" } }));
    }

    #[test]
    fn test_ref_follows_data_depth_of_cyclic_schema() {
        let mut table = TransformTable::new();
        table.insert(
            TransformKind::Date,
            "Node",
            vec![
                program(vec![access("at"), TransformStep::This]),
                program(vec![
                    access("children"),
                    TransformStep::Loop,
                    TransformStep::Ref("Node".into()),
                ]),
            ],
        );
        let payload = json!({
            "at": "0",
            "children": [
                { "at": "1", "children": [{ "at": "2", "children": [] }] },
                { "at": "3" }
            ]
        });
        let out = run_root(&table, payload, &[TransformProgram::reference("Node")]);
        assert_eq!(
            out,
            json!({
                "at": "<0>",
                "children": [
                    { "at": "<1>", "children": [{ "at": "<2>", "children": [] }] },
                    { "at": "<3>" }
                ]
            })
        );
    }

    #[test]
    fn test_ref_reentry_without_descent_terminates() {
        // A = allOf[B, {at}], B = allOf[A]: refs bounce on the same slot.
        let mut table = TransformTable::new();
        table.insert(
            TransformKind::Date,
            "A",
            vec![
                TransformProgram::reference("B"),
                program(vec![access("at"), TransformStep::This]),
            ],
        );
        table.insert(TransformKind::Date, "B", vec![TransformProgram::reference("A")]);
        let out = run_root(&table, json!({ "at": "x" }), &[TransformProgram::reference("A")]);
        assert_eq!(out, json!({ "at": "<x>" }));
    }

    #[test]
    fn test_ref_uses_requested_kind_only() {
        let mut table = TransformTable::new();
        table.insert(
            TransformKind::Binary,
            "Blob",
            vec![program(vec![access("data"), TransformStep::This])],
        );
        let out = run_root(&table, json!({ "data": "x" }), &[TransformProgram::reference("Blob")]);
        assert_eq!(out, json!({ "data": "x" }));
    }

    #[test]
    fn test_index_past_end_is_noop() {
        let mut container = Value::from(json!({ "a": "x" }));
        apply_this(&mut container, "a", &mut mark, 5);
        assert_eq!(container.into_json(), json!({ "a": "x" }));
    }

    #[test]
    fn test_strict_mode_reports_mismatches() {
        let table = TransformTable::new();
        let programs = [
            program(vec![
                access("items"),
                TransformStep::Loop,
                access("at"),
                TransformStep::This,
            ]),
            program(vec![access("meta"), TransformStep::Entries, TransformStep::This]),
            program(vec![access("gone"), TransformStep::Loop, TransformStep::This]),
        ];
        let mut payload = Value::from(json!({ "items": [{ "at": "1" }, "bogus"], "meta": null }));
        let mut interpreter = Interpreter::new(&table, TransformKind::Date).strict();
        interpreter.run_root(&mut payload, &mut mark, &programs);

        assert_eq!(
            interpreter.into_mismatches(),
            vec![ShapeMismatch {
                path: "$.items[1]".to_string(),
                step: "access",
                found: "string",
            }]
        );
        assert_eq!(
            payload.into_json(),
            json!({ "items": [{ "at": "<1>" }, "bogus"], "meta": null })
        );
    }

    #[test]
    fn test_lenient_mode_records_nothing() {
        let table = TransformTable::new();
        let programs = [program(vec![TransformStep::Loop, TransformStep::This])];
        let mut payload = Value::from(json!({ "not": "a list" }));
        let mut interpreter = Interpreter::new(&table, TransformKind::Date);
        interpreter.run_root(&mut payload, &mut mark, &programs);
        assert!(interpreter.mismatches().is_empty());
    }
}
