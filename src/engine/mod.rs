// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Batch mutation of the canvas graph.
//!
//! [`apply_instructions`] takes a snapshot and an ordered batch of [`Instruction`]s (hand-written
//! or produced by an external generator) and returns a candidate snapshot plus a report. Nothing
//! is committed here; the caller decides whether the candidate becomes the new state.
//!
//! Instructions may refer to entities created earlier *or later* in the same batch through
//! caller-chosen aliases. References that cannot be resolved yet are deferred and retried exactly
//! once after every other instruction ran; whatever is still unresolved is dropped with a warning.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::model::{
    Component, ComponentId, Connection, ConnectionDirection, ConnectionId, Frame, Id,
    LayerId, Snapshot, DEFAULT_COMPONENT_HEIGHT, DEFAULT_COMPONENT_WIDTH, DEFAULT_CONNECTION_TYPE,
};

pub mod wire;

pub use wire::{decode_batch, decode_batch_str, instruction_batch_schema, BatchDecodeError};

/// Horizontal spacing of the fallback placement grid.
pub const GRID_SPACING_X: f64 = 240.0;
/// Vertical spacing of the fallback placement grid.
pub const GRID_SPACING_Y: f64 = 180.0;
/// Top-left corner of the fallback placement grid.
pub const GRID_ORIGIN: (f64, f64) = (80.0, 80.0);
/// Slots per row before the fallback grid wraps.
pub const GRID_COLUMNS: usize = 3;

const DEFAULT_COMPONENT_TYPE: &str = "generic";

fn default_component_type() -> String {
    DEFAULT_COMPONENT_TYPE.to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddComponent {
    /// Provisional alias other instructions in the batch may use to refer to this component.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_component_type", alias = "kind")]
    pub component_type: String,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub layer_id: Option<String>,
}

impl AddComponent {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            id: None,
            component_type: component_type.into(),
            x: None,
            y: None,
            width: None,
            height: None,
            label: None,
            properties: BTreeMap::new(),
            layer_id: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.id = Some(alias.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPatch {
    #[serde(default, alias = "kind")]
    pub component_type: Option<String>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    /// Merged key by key into the existing properties.
    #[serde(default)]
    pub properties: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub layer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateComponent {
    pub id: String,
    #[serde(flatten)]
    pub patch: ComponentPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RemoveTarget {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddConnection {
    /// Provisional alias for later instructions in the batch.
    #[serde(default)]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub connection_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub direction: Option<ConnectionDirection>,
}

impl AddConnection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: None,
            from: from.into(),
            to: to.into(),
            connection_type: None,
            label: None,
            protocol: None,
            direction: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.id = Some(alias.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPatch {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub connection_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub direction: Option<ConnectionDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateConnection {
    pub id: String,
    #[serde(flatten)]
    pub patch: ConnectionPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Annotate {
    #[serde(default)]
    pub target: Option<String>,
    pub text: String,
}

/// One declarative mutation request.
///
/// `Unknown` and `Malformed` never come from well-formed input; the batch decoder produces them
/// so that bad elements are reported in order instead of rejecting the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    AddComponent(AddComponent),
    UpdateComponent(UpdateComponent),
    RemoveComponent(RemoveTarget),
    AddConnection(AddConnection),
    UpdateConnection(UpdateConnection),
    RemoveConnection(RemoveTarget),
    Annotate(Annotate),
    #[serde(skip)]
    Unknown { tag: String },
    #[serde(skip)]
    Malformed { tag: Option<String>, reason: String },
}

impl Instruction {
    pub const KNOWN_TAGS: [&'static str; 7] = [
        "add_component",
        "update_component",
        "remove_component",
        "add_connection",
        "update_connection",
        "remove_connection",
        "annotate",
    ];

    pub fn tag(&self) -> &str {
        match self {
            Self::AddComponent(_) => "add_component",
            Self::UpdateComponent(_) => "update_component",
            Self::RemoveComponent(_) => "remove_component",
            Self::AddConnection(_) => "add_connection",
            Self::UpdateConnection(_) => "update_connection",
            Self::RemoveConnection(_) => "remove_connection",
            Self::Annotate(_) => "annotate",
            Self::Unknown { tag } => tag,
            Self::Malformed { tag, .. } => tag.as_deref().unwrap_or("<missing>"),
        }
    }

    pub fn remove_component(id: impl Into<String>) -> Self {
        Self::RemoveComponent(RemoveTarget { id: id.into() })
    }

    pub fn remove_connection(id: impl Into<String>) -> Self {
        Self::RemoveConnection(RemoveTarget { id: id.into() })
    }

    pub fn update_component(id: impl Into<String>, patch: ComponentPatch) -> Self {
        Self::UpdateComponent(UpdateComponent {
            id: id.into(),
            patch,
        })
    }

    pub fn update_connection(id: impl Into<String>, patch: ConnectionPatch) -> Self {
        Self::UpdateConnection(UpdateConnection {
            id: id.into(),
            patch,
        })
    }
}

impl From<AddComponent> for Instruction {
    fn from(value: AddComponent) -> Self {
        Self::AddComponent(value)
    }
}

impl From<AddConnection> for Instruction {
    fn from(value: AddConnection) -> Self {
        Self::AddConnection(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Component,
    Connection,
    Frame,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Connection => "connection",
            Self::Frame => "frame",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Source of real ids for newly created entities.
pub trait IdAllocator {
    /// Returns a fresh id for `kind`. `is_taken` reports ids already used in the working state.
    fn allocate(&mut self, kind: EntityKind, is_taken: &dyn Fn(&str) -> bool) -> String;
}

/// Deterministic `component-1`, `component-2`, ... ids that skip anything already taken.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: HashMap<EntityKind, u64>,
}

impl IdAllocator for SequentialIds {
    fn allocate(&mut self, kind: EntityKind, is_taken: &dyn Fn(&str) -> bool) -> String {
        let counter = self.next.entry(kind).or_insert(1);
        loop {
            let candidate = format!("{}-{}", kind.prefix(), counter);
            *counter += 1;
            if !is_taken(&candidate) {
                return candidate;
            }
        }
    }
}

/// Random v4 UUID ids, prefixed with the entity kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdAllocator for UuidIds {
    fn allocate(&mut self, kind: EntityKind, is_taken: &dyn Fn(&str) -> bool) -> String {
        loop {
            let candidate = format!("{}-{}", kind.prefix(), uuid::Uuid::new_v4());
            if !is_taken(&candidate) {
                return candidate;
            }
        }
    }
}

pub(crate) fn allocate_id<T>(
    allocator: &mut dyn IdAllocator,
    kind: EntityKind,
    is_taken: &dyn Fn(&str) -> bool,
) -> Id<T> {
    let raw = allocator.allocate(kind, is_taken);
    if !is_taken(&raw) {
        if let Ok(id) = Id::new(raw) {
            return id;
        }
    }
    // A custom allocator handed out something unusable or already in use.
    let mut fallback = SequentialIds::default();
    loop {
        let raw = fallback.allocate(kind, is_taken);
        if is_taken(&raw) {
            continue;
        }
        if let Ok(id) = Id::new(raw) {
            return id;
        }
    }
}

/// Non-fatal problem encountered while applying a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchWarning {
    UnresolvedReference {
        index: usize,
        instruction: String,
        kind: EntityKind,
        reference: String,
    },
    UnknownInstruction {
        index: usize,
        tag: String,
    },
    MalformedInstruction {
        index: usize,
        tag: Option<String>,
        reason: String,
    },
    AnnotationIgnored {
        index: usize,
        target: Option<String>,
    },
    AliasRebound {
        index: usize,
        alias: String,
    },
    /// A field value was rejected; the rest of the instruction still applied.
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },
    OrphanPruned {
        connection_id: ConnectionId,
    },
}

impl fmt::Display for BatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference {
                index,
                instruction,
                kind,
                reference,
            } => write!(
                f,
                "#{index} {instruction}: skipped, {kind} '{reference}' does not exist"
            ),
            Self::UnknownInstruction { index, tag } => {
                write!(f, "#{index}: unknown instruction type '{tag}' ignored")
            }
            Self::MalformedInstruction { index, tag, reason } => match tag {
                Some(tag) => write!(f, "#{index} {tag}: malformed instruction ignored: {reason}"),
                None => write!(f, "#{index}: malformed instruction ignored: {reason}"),
            },
            Self::AnnotationIgnored { index, target } => match target {
                Some(target) => write!(
                    f,
                    "#{index} annotate: annotation on '{target}' not applied to the graph"
                ),
                None => write!(f, "#{index} annotate: annotation not applied to the graph"),
            },
            Self::AliasRebound { index, alias } => {
                write!(f, "#{index}: alias '{alias}' reused, now refers to the newer entity")
            }
            Self::InvalidField {
                index,
                field,
                value,
            } => write!(f, "#{index}: invalid {field} '{value}' ignored"),
            Self::OrphanPruned { connection_id } => {
                write!(f, "connection {connection_id} pruned: endpoint no longer exists")
            }
        }
    }
}

/// Outcome counters and warnings for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionBatchResult {
    pub added_components: usize,
    pub updated_components: usize,
    pub removed_components: usize,
    pub added_connections: usize,
    pub updated_connections: usize,
    /// Explicit removals plus cascade removals.
    pub removed_connections: usize,
    pub cascade_removed_connections: usize,
    /// Instructions dropped without effect.
    pub skipped: usize,
    pub annotations: usize,
    pub pruned_orphans: usize,
    /// Alias -> real id for every entity created under an alias.
    pub alias_map: BTreeMap<String, String>,
    pub warnings: Vec<BatchWarning>,
}

impl InstructionBatchResult {
    pub fn has_changes(&self) -> bool {
        self.added_components
            + self.updated_components
            + self.removed_components
            + self.added_connections
            + self.updated_connections
            + self.removed_connections
            + self.pruned_orphans
            > 0
    }

    /// Short human-readable digest, e.g. `"3 components added, 1 connection skipped"`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        let mut push = |count: usize, noun: &str, verb: &str| {
            if count > 0 {
                let plural = if count == 1 { "" } else { "s" };
                parts.push(format!("{count} {noun}{plural} {verb}"));
            }
        };
        push(self.added_components, "component", "added");
        push(self.updated_components, "component", "updated");
        push(self.removed_components, "component", "removed");
        push(self.added_connections, "connection", "added");
        push(self.updated_connections, "connection", "updated");
        push(self.removed_connections, "connection", "removed");
        push(self.skipped, "instruction", "skipped");
        push(self.pruned_orphans, "orphan connection", "pruned");

        if parts.is_empty() {
            "no changes".to_owned()
        } else {
            parts.join(", ")
        }
    }
}

/// Applies `instructions` to a copy of `snapshot` using deterministic [`SequentialIds`].
pub fn apply_instructions(
    snapshot: &Snapshot,
    instructions: &[Instruction],
) -> (Snapshot, InstructionBatchResult) {
    apply_instructions_with(snapshot, instructions, &mut SequentialIds::default())
}

/// Applies `instructions` to a copy of `snapshot`, drawing new ids from `allocator`.
///
/// The input snapshot is never mutated. Data problems (unknown tags, malformed payloads,
/// references that stay unresolved after the retry pass) are reported as warnings and the rest
/// of the batch still applies.
pub fn apply_instructions_with(
    snapshot: &Snapshot,
    instructions: &[Instruction],
    allocator: &mut dyn IdAllocator,
) -> (Snapshot, InstructionBatchResult) {
    let mut working = WorkingSet::from_snapshot(snapshot);
    let mut result = InstructionBatchResult::default();

    let mut deferred = Vec::new();
    for (index, instruction) in instructions.iter().enumerate() {
        match working.apply(index, instruction, allocator, &mut result) {
            Step::Done => {}
            Step::Deferred(missing) => {
                tracing::trace!(index, reference = %missing.reference, "deferring instruction");
                deferred.push((index, instruction));
            }
        }
    }

    // Single retry; nothing is attempted a third time.
    for (index, instruction) in deferred {
        if let Step::Deferred(missing) = working.apply(index, instruction, allocator, &mut result)
        {
            result.skipped += 1;
            result.warnings.push(BatchWarning::UnresolvedReference {
                index,
                instruction: instruction.tag().to_owned(),
                kind: missing.kind,
                reference: missing.reference,
            });
        }
    }

    let mut candidate = working.into_snapshot(snapshot);
    let pruned = candidate.prune_orphans();
    result.pruned_orphans = pruned.connections.len();
    for connection_id in pruned.connections {
        result
            .warnings
            .push(BatchWarning::OrphanPruned { connection_id });
    }

    tracing::debug!(
        instructions = instructions.len(),
        warnings = result.warnings.len(),
        summary = %result.summary(),
        "applied instruction batch"
    );

    (candidate, result)
}

/// Reference that could not be resolved when an instruction ran.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MissingRef {
    kind: EntityKind,
    reference: String,
}

#[derive(Debug)]
enum Step {
    Done,
    Deferred(MissingRef),
}

/// Mutable copy of the graph plus the alias table for one batch.
#[derive(Debug)]
struct WorkingSet {
    components: IndexMap<ComponentId, Component>,
    connections: IndexMap<ConnectionId, Connection>,
    frames: Vec<Frame>,
    component_aliases: HashMap<String, ComponentId>,
    connection_aliases: HashMap<String, ConnectionId>,
    placed_components: usize,
}

// Per-instruction handlers for `WorkingSet`.
include!("engine_impl.rs");
