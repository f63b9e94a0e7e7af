// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::frame::Bounds;
use super::ids::{ComponentId, ConnectionId, FrameId, LayerId};

pub const DEFAULT_COMPONENT_WIDTH: f64 = 160.0;
pub const DEFAULT_COMPONENT_HEIGHT: f64 = 96.0;
pub const DEFAULT_CONNECTION_TYPE: &str = "data";

/// A typed box placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: ComponentId,
    #[serde(rename = "type")]
    pub component_type: SmolStr,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_frame_id: Option<FrameId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<LayerId>,
}

fn default_width() -> f64 {
    DEFAULT_COMPONENT_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_COMPONENT_HEIGHT
}

impl Component {
    pub fn new(id: ComponentId, component_type: impl Into<SmolStr>, x: f64, y: f64) -> Self {
        Self {
            id,
            component_type: component_type.into(),
            x,
            y,
            width: DEFAULT_COMPONENT_WIDTH,
            height: DEFAULT_COMPONENT_HEIGHT,
            label: String::new(),
            properties: BTreeMap::new(),
            parent_frame_id: None,
            layer_id: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Axis-aligned box covered by this component on the canvas.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }
}

/// Arrowhead placement for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionDirection {
    End,
    Start,
    Both,
    None,
}

/// A directed edge between two components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from: ComponentId,
    pub to: ComponentId,
    #[serde(rename = "type")]
    pub connection_type: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<ConnectionDirection>,
}

impl Connection {
    pub fn new(id: ConnectionId, from: ComponentId, to: ComponentId) -> Self {
        Self {
            id,
            from,
            to,
            connection_type: SmolStr::new_static(DEFAULT_CONNECTION_TYPE),
            label: None,
            protocol: None,
            direction: None,
        }
    }

    pub fn touches(&self, component_id: &ComponentId) -> bool {
        &self.from == component_id || &self.to == component_id
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}
