// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::{ComponentId, FrameId};

pub const DEFAULT_FRAME_COLOR: &str = "#4f46e5";

/// Axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Bounds::new(x, y, right - x, bottom - y)
    }

    /// Grows the box by `padding` on every side.
    pub fn expand(&self, padding: f64) -> Bounds {
        Bounds::new(
            self.x - padding,
            self.y - padding,
            self.width + padding * 2.0,
            self.height + padding * 2.0,
        )
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// An organizational rectangle grouping components.
///
/// Frames only track membership; they never scale or otherwise transform their members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: FrameId,
    pub name: String,
    pub bounds: Bounds,
    #[serde(default)]
    pub component_ids: BTreeSet<ComponentId>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub locked: bool,
}

fn default_color() -> String {
    DEFAULT_FRAME_COLOR.to_owned()
}

impl Frame {
    pub fn new(id: FrameId, name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id,
            name: name.into(),
            bounds,
            component_ids: BTreeSet::new(),
            collapsed: false,
            color: default_color(),
            locked: false,
        }
    }

    pub fn contains(&self, component_id: &ComponentId) -> bool {
        self.component_ids.contains(component_id)
    }
}

#[cfg(test)]
mod tests {
    use super::Bounds;

    #[test]
    fn union_covers_both_boxes() {
        let a = Bounds::new(0.0, 0.0, 160.0, 96.0);
        let b = Bounds::new(300.0, 300.0, 160.0, 96.0);
        assert_eq!(a.union(&b), Bounds::new(0.0, 0.0, 460.0, 396.0));
    }

    #[test]
    fn expand_grows_every_side() {
        let b = Bounds::new(10.0, 20.0, 100.0, 50.0).expand(5.0);
        assert_eq!(b, Bounds::new(5.0, 15.0, 110.0, 60.0));
    }
}
