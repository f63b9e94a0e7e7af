// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::component::{Component, Connection};
use super::frame::Frame;
use super::ids::{ComponentId, ConnectionId, FrameId, LayerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub order: i32,
}

fn default_true() -> bool {
    true
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>, order: i32) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            locked: false,
            order,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default)]
    pub component_ids: Vec<ComponentId>,
    #[serde(default)]
    pub connection_ids: Vec<ConnectionId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.component_ids.is_empty() && self.connection_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveTool {
    #[default]
    Select,
    Pan,
    Zoom,
    Connect,
    Annotate,
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    pub enabled: bool,
    pub size: f64,
    pub snap_to_grid: bool,
    pub visible: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 20.0,
            snap_to_grid: false,
            visible: true,
        }
    }
}

/// Entities removed by [`Snapshot::prune_orphans`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub connections: Vec<ConnectionId>,
    pub memberships: usize,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty() && self.memberships == 0
    }
}

/// The full canvas graph at one point in history.
///
/// Snapshots are treated as immutable once committed; the store hands them out behind `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub active_tool: ActiveTool,
    #[serde(default)]
    pub grid_config: GridConfig,
}

impl Snapshot {
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id.as_str() == id)
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.id.as_str() == id)
    }

    pub fn contains_component(&self, id: &str) -> bool {
        self.component(id).is_some()
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id.as_str() == id)
    }

    pub fn frame(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id.as_str() == id)
    }

    pub fn frame_mut(&mut self, id: &str) -> Option<&mut Frame> {
        self.frames.iter_mut().find(|f| f.id.as_str() == id)
    }

    /// Frame that currently lists `component_id` as a member, if any.
    pub fn frame_of(&self, component_id: &ComponentId) -> Option<&Frame> {
        self.frames.iter().find(|f| f.contains(component_id))
    }

    pub fn frame_ids(&self) -> BTreeSet<FrameId> {
        self.frames.iter().map(|f| f.id.clone()).collect()
    }

    /// Removes connections with a dangling endpoint and frame memberships pointing at missing
    /// components. Stale `parent_frame_id` values are cleared as well.
    pub fn prune_orphans(&mut self) -> PruneReport {
        let component_ids = self
            .components
            .iter()
            .map(|c| c.id.clone())
            .collect::<BTreeSet<_>>();

        let mut report = PruneReport::default();
        self.connections.retain(|conn| {
            let keep = component_ids.contains(&conn.from) && component_ids.contains(&conn.to);
            if !keep {
                report.connections.push(conn.id.clone());
            }
            keep
        });

        for frame in &mut self.frames {
            let before = frame.component_ids.len();
            frame.component_ids.retain(|id| component_ids.contains(id));
            report.memberships += before - frame.component_ids.len();
        }

        let frame_ids = self.frame_ids();
        for component in &mut self.components {
            if component
                .parent_frame_id
                .as_ref()
                .is_some_and(|frame_id| !frame_ids.contains(frame_id))
            {
                component.parent_frame_id = None;
                report.memberships += 1;
            }
        }

        self.selection
            .component_ids
            .retain(|id| component_ids.contains(id));
        let connection_ids = self
            .connections
            .iter()
            .map(|c| c.id.as_str())
            .collect::<BTreeSet<_>>();
        self.selection
            .connection_ids
            .retain(|id| connection_ids.contains(id.as_str()));

        report
    }
}
