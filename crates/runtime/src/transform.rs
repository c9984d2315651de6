//! Transform Language: compiled path programs and the tables that hold them.
//!
//! A [`TransformProgram`] describes where, inside an arbitrarily nested payload,
//! a value-level conversion applies. Programs never embed another schema's
//! steps; a [`TransformStep::Ref`] indirects through a [`TransformResolver`]
//! at interpretation time, so cyclic schemas produce finite programs.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The conversion a program set is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// `format: date-time` and `format: date` strings
    Date,
    /// `format: byte` and `format: binary` strings (base64 on the wire)
    Binary,
}

impl TransformKind {
    /// Every kind, in table order.
    pub const ALL: [TransformKind; 2] = [TransformKind::Date, TransformKind::Binary];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Date => "date",
            TransformKind::Binary => "binary",
        }
    }

    /// Map a schema `format` to the transform kind it needs, if any.
    pub fn for_format(format: &str) -> Option<Self> {
        match format {
            "date-time" | "date" => Some(TransformKind::Date),
            "byte" | "binary" => Some(TransformKind::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a transform program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "lowercase")]
pub enum TransformStep {
    /// Replace the addressed value with the transform result.
    This,
    /// Descend into a field of a keyed structure.
    Access(String),
    /// Run the rest of the program for every element of a sequence.
    Loop,
    /// Run the rest of the program for every value of a keyed structure.
    Entries,
    /// Fan out: run each sub-program against the same slot.
    Select(Vec<TransformProgram>),
    /// Run the programs registered for a named schema.
    Ref(String),
}

impl TransformStep {
    pub fn name(&self) -> &'static str {
        match self {
            TransformStep::This => "this",
            TransformStep::Access(_) => "access",
            TransformStep::Loop => "loop",
            TransformStep::Entries => "entries",
            TransformStep::Select(_) => "select",
            TransformStep::Ref(_) => "ref",
        }
    }
}

/// An ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformProgram(Vec<TransformStep>);

impl TransformProgram {
    pub fn new(steps: Vec<TransformStep>) -> Self {
        Self(steps)
    }

    /// The program that transforms the addressed value itself.
    pub fn this() -> Self {
        Self(vec![TransformStep::This])
    }

    /// The program that defers to a named schema's programs.
    pub fn reference(name: impl Into<String>) -> Self {
        Self(vec![TransformStep::Ref(name.into())])
    }

    /// Prepend a step, returning the extended program.
    pub fn prefixed(mut self, step: TransformStep) -> Self {
        self.0.insert(0, step);
        self
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.0
    }

    pub fn step(&self, index: usize) -> Option<&TransformStep> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<TransformStep>> for TransformProgram {
    fn from(steps: Vec<TransformStep>) -> Self {
        Self(steps)
    }
}

/// Lookup used by `ref` steps.
pub trait TransformResolver {
    /// Programs registered for `name` under `kind`, in registration order.
    fn get_transforms(&self, kind: TransformKind, name: &str) -> &[TransformProgram];
}

/// Name-keyed program table, one section per transform kind.
///
/// Filled once during compilation, then read-only while payloads are processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformTable {
    kinds: BTreeMap<TransformKind, IndexMap<String, Vec<TransformProgram>>>,
}

impl TransformTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the programs for a schema. Empty program lists are not stored.
    pub fn insert(
        &mut self,
        kind: TransformKind,
        name: impl Into<String>,
        programs: Vec<TransformProgram>,
    ) {
        if programs.is_empty() {
            return;
        }
        self.kinds
            .entry(kind)
            .or_default()
            .insert(name.into(), programs);
    }

    pub fn contains(&self, kind: TransformKind, name: &str) -> bool {
        self.kinds
            .get(&kind)
            .is_some_and(|names| names.contains_key(name))
    }

    /// Names with at least one program for `kind`.
    pub fn names(&self, kind: TransformKind) -> impl Iterator<Item = &str> {
        self.kinds
            .get(&kind)
            .into_iter()
            .flat_map(|names| names.keys().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.values().all(IndexMap::is_empty)
    }

    /// Drop every program that can only end in `ref` steps to schemas with no
    /// effective transform, then drop schemas left without programs.
    ///
    /// Returns the set of live names per kind, for pruning programs stored
    /// outside the table.
    pub fn prune(&mut self) -> BTreeMap<TransformKind, HashSet<String>> {
        let mut live_by_kind = BTreeMap::new();
        for (kind, names) in &mut self.kinds {
            let live = live_names(names);
            for programs in names.values_mut() {
                *programs = prune_programs(std::mem::take(programs), &live);
            }
            names.retain(|_, programs| !programs.is_empty());
            live_by_kind.insert(*kind, live);
        }
        self.kinds.retain(|_, names| !names.is_empty());
        live_by_kind
    }
}

impl TransformResolver for TransformTable {
    fn get_transforms(&self, kind: TransformKind, name: &str) -> &[TransformProgram] {
        self.kinds
            .get(&kind)
            .and_then(|names| names.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Fixpoint over the table: a name is live when one of its programs reaches a
/// `this` step, or a `ref` to a live name.
fn live_names(table: &IndexMap<String, Vec<TransformProgram>>) -> HashSet<String> {
    let mut live: HashSet<String> = HashSet::new();
    loop {
        let mut changed = false;
        for (name, programs) in table {
            if live.contains(name) {
                continue;
            }
            if programs.iter().any(|p| reaches_live(p.steps(), &live)) {
                live.insert(name.clone());
                changed = true;
            }
        }
        if !changed {
            return live;
        }
    }
}

fn reaches_live(steps: &[TransformStep], live: &HashSet<String>) -> bool {
    match steps.last() {
        Some(TransformStep::This) => true,
        Some(TransformStep::Ref(name)) => live.contains(name),
        Some(TransformStep::Select(programs)) => {
            programs.iter().any(|p| reaches_live(p.steps(), live))
        }
        _ => false,
    }
}

/// Remove programs (and `select` arms) that cannot reach a live terminal.
pub fn prune_programs(
    programs: Vec<TransformProgram>,
    live: &HashSet<String>,
) -> Vec<TransformProgram> {
    programs
        .into_iter()
        .filter_map(|program| prune_program(program, live))
        .collect()
}

fn prune_program(program: TransformProgram, live: &HashSet<String>) -> Option<TransformProgram> {
    let mut steps = program.0;
    match steps.pop()? {
        TransformStep::This => steps.push(TransformStep::This),
        TransformStep::Ref(name) => {
            if !live.contains(&name) {
                return None;
            }
            steps.push(TransformStep::Ref(name));
        }
        TransformStep::Select(arms) => {
            let arms = prune_programs(arms, live);
            if arms.is_empty() {
                return None;
            }
            steps.push(TransformStep::Select(arms));
        }
        _ => return None,
    }
    Some(TransformProgram(steps))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn access(key: &str) -> TransformStep {
        TransformStep::Access(key.to_string())
    }

    #[test]
    fn test_step_serialization_is_tagged() {
        let program =
            TransformProgram::new(vec![access("items"), TransformStep::Loop, TransformStep::This]);
        let json = serde_json::to_value(&program).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "op": "access", "arg": "items" },
                { "op": "loop" },
                { "op": "this" }
            ])
        );
        let back: TransformProgram = serde_json::from_value(json).unwrap();
        assert_eq!(back, program);
    }

    #[test]
    fn test_format_mapping() {
        assert_eq!(TransformKind::for_format("date-time"), Some(TransformKind::Date));
        assert_eq!(TransformKind::for_format("date"), Some(TransformKind::Date));
        assert_eq!(TransformKind::for_format("byte"), Some(TransformKind::Binary));
        assert_eq!(TransformKind::for_format("uuid"), None);
    }

    #[test]
    fn test_missing_name_resolves_to_empty() {
        let table = TransformTable::new();
        assert!(table.get_transforms(TransformKind::Date, "Nope").is_empty());
    }

    #[test]
    fn test_insert_skips_empty_program_lists() {
        let mut table = TransformTable::new();
        table.insert(TransformKind::Date, "Plain", vec![]);
        assert!(!table.contains(TransformKind::Date, "Plain"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_prune_keeps_cycles_with_a_terminal() {
        // Node -> children[] -> Node, plus a date field: live through the cycle.
        let mut table = TransformTable::new();
        table.insert(
            TransformKind::Date,
            "Node",
            vec![
                TransformProgram::new(vec![access("createdAt"), TransformStep::This]),
                TransformProgram::new(vec![
                    access("children"),
                    TransformStep::Loop,
                    TransformStep::Ref("Node".into()),
                ]),
            ],
        );
        let live = table.prune();
        assert!(live[&TransformKind::Date].contains("Node"));
        assert_eq!(table.get_transforms(TransformKind::Date, "Node").len(), 2);
    }

    #[test]
    fn test_prune_drops_dead_cycles() {
        // A <-> B reference each other but never reach a `this` step.
        let mut table = TransformTable::new();
        for (name, field, target) in [("A", "b", "B"), ("B", "a", "A")] {
            table.insert(
                TransformKind::Date,
                name,
                vec![TransformProgram::new(vec![
                    access(field),
                    TransformStep::Ref(target.into()),
                ])],
            );
        }
        table.insert(
            TransformKind::Date,
            "C",
            vec![TransformProgram::new(vec![
                access("x"),
                TransformStep::Select(vec![
                    TransformProgram::reference("A"),
                    TransformProgram::new(vec![access("at"), TransformStep::This]),
                ]),
            ])],
        );

        table.prune();

        assert!(!table.contains(TransformKind::Date, "A"));
        assert!(!table.contains(TransformKind::Date, "B"));
        assert_eq!(
            table.get_transforms(TransformKind::Date, "C"),
            &[TransformProgram::new(vec![
                access("x"),
                TransformStep::Select(vec![TransformProgram::new(vec![
                    access("at"),
                    TransformStep::This,
                ])]),
            ])]
        );
    }
}
