// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;
use std::fmt;

use crate::frames::{derive_component_bounds, DEFAULT_FRAME_PADDING};
use crate::model::{
    Bounds, ComponentId, ConnectionId, FrameId, Snapshot, DEFAULT_COMPONENT_HEIGHT,
    DEFAULT_COMPONENT_WIDTH,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    DuplicateComponentId(ComponentId),
    DuplicateConnectionId(ConnectionId),
    DuplicateFrameId(FrameId),
    NonFiniteComponent(ComponentId),
    NonFiniteFrame(FrameId),
    OrphanConnection {
        connection: ConnectionId,
        missing: ComponentId,
    },
    SelfConnection(ConnectionId),
    MissingFrameMember {
        frame: FrameId,
        component: ComponentId,
    },
    NonPositiveSize(ComponentId),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateComponentId(id) => write!(f, "duplicate component id `{id}`"),
            Self::DuplicateConnectionId(id) => write!(f, "duplicate connection id `{id}`"),
            Self::DuplicateFrameId(id) => write!(f, "duplicate frame id `{id}`"),
            Self::NonFiniteComponent(id) => write!(f, "component `{id}` has non-finite geometry"),
            Self::NonFiniteFrame(id) => write!(f, "frame `{id}` has non-finite bounds"),
            Self::OrphanConnection {
                connection,
                missing,
            } => write!(
                f,
                "connection `{connection}` references missing component `{missing}`"
            ),
            Self::SelfConnection(id) => write!(f, "connection `{id}` connects a component to itself"),
            Self::MissingFrameMember { frame, component } => write!(
                f,
                "frame `{frame}` lists missing component `{component}`"
            ),
            Self::NonPositiveSize(id) => write!(f, "component `{id}` has a non-positive size"),
        }
    }
}

/// Outcome of [`validate_snapshot`]. Errors block saving; warnings are repairable or advisory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

pub fn validate_snapshot(snapshot: &Snapshot) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut component_ids = BTreeSet::new();
    for component in &snapshot.components {
        if !component_ids.insert(component.id.clone()) {
            report
                .errors
                .push(ValidationIssue::DuplicateComponentId(component.id.clone()));
        }
        if !component.bounds().is_finite() {
            report
                .errors
                .push(ValidationIssue::NonFiniteComponent(component.id.clone()));
        } else if component.width <= 0.0 || component.height <= 0.0 {
            report
                .warnings
                .push(ValidationIssue::NonPositiveSize(component.id.clone()));
        }
    }

    let mut connection_ids = BTreeSet::new();
    for connection in &snapshot.connections {
        if !connection_ids.insert(connection.id.clone()) {
            report
                .errors
                .push(ValidationIssue::DuplicateConnectionId(connection.id.clone()));
        }
        for endpoint in [&connection.from, &connection.to] {
            if !component_ids.contains(endpoint) {
                report.warnings.push(ValidationIssue::OrphanConnection {
                    connection: connection.id.clone(),
                    missing: endpoint.clone(),
                });
                break;
            }
        }
        if connection.is_self_loop() {
            report
                .warnings
                .push(ValidationIssue::SelfConnection(connection.id.clone()));
        }
    }

    let mut frame_ids = BTreeSet::new();
    for frame in &snapshot.frames {
        if !frame_ids.insert(frame.id.clone()) {
            report
                .errors
                .push(ValidationIssue::DuplicateFrameId(frame.id.clone()));
        }
        if !frame.bounds.is_finite() {
            report
                .errors
                .push(ValidationIssue::NonFiniteFrame(frame.id.clone()));
        }
        for member in &frame.component_ids {
            if !component_ids.contains(member) {
                report.warnings.push(ValidationIssue::MissingFrameMember {
                    frame: frame.id.clone(),
                    component: member.clone(),
                });
            }
        }
    }

    report
}

/// Best-effort fix-up of a loaded or about-to-be-saved snapshot.
///
/// Keeps the first entity of every duplicated id, resets broken geometry to defaults and prunes
/// dangling connections and frame memberships. Self-connections are left alone.
pub fn repair_snapshot(mut snapshot: Snapshot) -> Snapshot {
    let mut seen = BTreeSet::new();
    snapshot.components.retain(|c| seen.insert(c.id.clone()));
    let mut seen = BTreeSet::new();
    snapshot.connections.retain(|c| seen.insert(c.id.clone()));
    let mut seen = BTreeSet::new();
    snapshot.frames.retain(|f| seen.insert(f.id.clone()));

    for component in &mut snapshot.components {
        if !component.x.is_finite() {
            component.x = 0.0;
        }
        if !component.y.is_finite() {
            component.y = 0.0;
        }
        if !component.width.is_finite() || component.width <= 0.0 {
            component.width = DEFAULT_COMPONENT_WIDTH;
        }
        if !component.height.is_finite() || component.height <= 0.0 {
            component.height = DEFAULT_COMPONENT_HEIGHT;
        }
    }

    let report = snapshot.prune_orphans();
    if !report.is_empty() {
        tracing::debug!(
            connections = report.connections.len(),
            memberships = report.memberships,
            "pruned orphans during repair"
        );
    }

    for index in 0..snapshot.frames.len() {
        if snapshot.frames[index].bounds.is_finite() {
            continue;
        }
        let members = snapshot.frames[index]
            .component_ids
            .iter()
            .cloned()
            .collect::<Vec<_>>();
        snapshot.frames[index].bounds =
            derive_component_bounds(&snapshot.components, &members, DEFAULT_FRAME_PADDING)
                .unwrap_or_else(|| Bounds::new(0.0, 0.0, 0.0, 0.0));
    }

    snapshot
}
