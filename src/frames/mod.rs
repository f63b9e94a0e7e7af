// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Frames: named rectangles that group components.
//!
//! Membership is mirrored on both sides (`Frame::component_ids` and
//! `Component::parent_frame_id`) and a component sits in at most one frame. Moving a frame drags
//! its members along; resizing never touches them.

use serde::{Deserialize, Serialize};

use crate::engine::{allocate_id, EntityKind, SequentialIds};
use crate::model::{Bounds, Component, ComponentId, Frame, FrameId, Snapshot};
use crate::state::VersionedStateStore;

pub const DEFAULT_FRAME_PADDING: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FrameConfig {
    /// Space added around members when bounds are derived from a selection.
    pub padding: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_FRAME_PADDING,
        }
    }
}

/// Optional attributes for a new frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameOptions {
    pub color: Option<String>,
    pub collapsed: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("frame `{0}` does not exist")]
    NotFound(String),
    #[error("frame `{0}` is locked")]
    Locked(FrameId),
    #[error("no selected component is on the canvas")]
    EmptySelection,
    #[error("invalid frame bounds {0:?}")]
    InvalidBounds(Bounds),
}

/// Smallest box covering the listed components, grown by `padding` on every side.
///
/// Ids that match no component are ignored; `None` means nothing matched.
pub fn derive_component_bounds(
    components: &[Component],
    ids: &[ComponentId],
    padding: f64,
) -> Option<Bounds> {
    components
        .iter()
        .filter(|component| ids.contains(&component.id))
        .map(Component::bounds)
        .reduce(|acc, bounds| acc.union(&bounds))
        .map(|bounds| bounds.expand(padding))
}

/// Frame operations on top of a [`VersionedStateStore`].
///
/// Every successful mutation is exactly one commit, so one undo reverts it. Operations that
/// change nothing do not commit.
pub struct FrameOrganizer<'a> {
    store: &'a mut VersionedStateStore,
    config: FrameConfig,
}

impl<'a> FrameOrganizer<'a> {
    pub(crate) fn new(store: &'a mut VersionedStateStore, config: FrameConfig) -> Self {
        Self { store, config }
    }

    pub fn create_frame(
        &mut self,
        name: impl Into<String>,
        bounds: Bounds,
        component_ids: &[ComponentId],
        options: FrameOptions,
    ) -> Result<FrameId, FrameError> {
        check_bounds(bounds)?;
        let name = name.into();
        self.edit(|snapshot| {
            let id: FrameId = allocate_id(&mut SequentialIds::default(), EntityKind::Frame, &|id| {
                snapshot.frame(id).is_some()
            });
            let mut frame = Frame::new(id.clone(), name, bounds);
            frame.collapsed = options.collapsed;
            frame.locked = options.locked;
            if let Some(color) = options.color {
                frame.color = color;
            }
            snapshot.frames.push(frame);
            attach(snapshot, &id, component_ids);
            tracing::debug!(frame = %id, members = component_ids.len(), "frame created");
            Ok(id)
        })
    }

    /// Frames the current selection, sizing the frame to the selected components plus padding.
    pub fn wrap_selection(
        &mut self,
        name: impl Into<String>,
        options: FrameOptions,
    ) -> Result<FrameId, FrameError> {
        let state = self.store.get_state();
        let ids = state.selection.component_ids.clone();
        let bounds = derive_component_bounds(&state.components, &ids, self.config.padding)
            .ok_or(FrameError::EmptySelection)?;
        self.create_frame(name, bounds, &ids, options)
    }

    /// Removes the frame. Members stay on the canvas, detached.
    pub fn delete_frame(&mut self, frame_id: &str) -> Result<(), FrameError> {
        self.edit(|snapshot| {
            let index = snapshot
                .frames
                .iter()
                .position(|frame| frame.id.as_str() == frame_id)
                .ok_or_else(|| FrameError::NotFound(frame_id.to_owned()))?;
            let frame = snapshot.frames.remove(index);
            for component in &mut snapshot.components {
                if component.parent_frame_id.as_ref() == Some(&frame.id) {
                    component.parent_frame_id = None;
                }
            }
            Ok(())
        })
    }

    /// Moves the frame's top-left corner to `(x, y)` and translates every member by the same delta.
    pub fn move_frame(&mut self, frame_id: &str, x: f64, y: f64) -> Result<(), FrameError> {
        self.edit(|snapshot| {
            let frame = unlocked_frame(snapshot, frame_id)?;
            let (dx, dy) = (x - frame.bounds.x, y - frame.bounds.y);
            let mut target = frame.bounds;
            target.translate(dx, dy);
            check_bounds(target)?;
            frame.bounds = target;
            let members = frame.component_ids.clone();
            for component in &mut snapshot.components {
                if members.contains(&component.id) {
                    component.translate(dx, dy);
                }
            }
            Ok(())
        })
    }

    /// Replaces the frame's bounds. Members keep their position and size.
    pub fn resize_frame(&mut self, frame_id: &str, bounds: Bounds) -> Result<(), FrameError> {
        check_bounds(bounds)?;
        self.edit(|snapshot| {
            unlocked_frame(snapshot, frame_id)?.bounds = bounds;
            Ok(())
        })
    }

    pub fn collapse(&mut self, frame_id: &str) -> Result<(), FrameError> {
        self.set_collapsed(frame_id, true)
    }

    pub fn expand(&mut self, frame_id: &str) -> Result<(), FrameError> {
        self.set_collapsed(frame_id, false)
    }

    /// Flips the collapsed flag and returns the new value.
    pub fn toggle_collapsed(&mut self, frame_id: &str) -> Result<bool, FrameError> {
        self.edit(|snapshot| {
            let frame = find_frame(snapshot, frame_id)?;
            frame.collapsed = !frame.collapsed;
            Ok(frame.collapsed)
        })
    }

    /// Adds existing components to the frame, taking them out of any other frame. Returns how
    /// many components were not members before.
    pub fn add_components_to_frame(
        &mut self,
        frame_id: &str,
        component_ids: &[ComponentId],
    ) -> Result<usize, FrameError> {
        self.edit(|snapshot| {
            let id = find_frame(snapshot, frame_id)?.id.clone();
            Ok(attach(snapshot, &id, component_ids))
        })
    }

    /// Returns how many of `component_ids` were members.
    pub fn remove_components_from_frame(
        &mut self,
        frame_id: &str,
        component_ids: &[ComponentId],
    ) -> Result<usize, FrameError> {
        self.edit(|snapshot| {
            let frame = find_frame(snapshot, frame_id)?;
            let id = frame.id.clone();
            let removed = component_ids
                .iter()
                .filter(|component_id| frame.component_ids.remove(*component_id))
                .cloned()
                .collect::<Vec<_>>();
            for component in &mut snapshot.components {
                if removed.contains(&component.id) && component.parent_frame_id.as_ref() == Some(&id)
                {
                    component.parent_frame_id = None;
                }
            }
            Ok(removed.len())
        })
    }

    pub fn rename_frame(&mut self, frame_id: &str, name: impl Into<String>) -> Result<(), FrameError> {
        let name = name.into();
        self.edit(|snapshot| {
            find_frame(snapshot, frame_id)?.name = name;
            Ok(())
        })
    }

    pub fn set_locked(&mut self, frame_id: &str, locked: bool) -> Result<(), FrameError> {
        self.edit(|snapshot| {
            find_frame(snapshot, frame_id)?.locked = locked;
            Ok(())
        })
    }

    pub fn frame_for_component(&self, component_id: &ComponentId) -> Option<FrameId> {
        self.store
            .get_state()
            .frame_of(component_id)
            .map(|frame| frame.id.clone())
    }

    fn set_collapsed(&mut self, frame_id: &str, collapsed: bool) -> Result<(), FrameError> {
        self.edit(|snapshot| {
            find_frame(snapshot, frame_id)?.collapsed = collapsed;
            Ok(())
        })
    }

    /// Runs `f` on a copy of the current state and commits the copy if `f` succeeded and changed
    /// something.
    fn edit<R>(
        &mut self,
        f: impl FnOnce(&mut Snapshot) -> Result<R, FrameError>,
    ) -> Result<R, FrameError> {
        let current = self.store.get_state();
        let mut next = Snapshot::clone(&current);
        let out = f(&mut next)?;
        if next != *current {
            self.store.replace(next);
        }
        Ok(out)
    }
}

fn check_bounds(bounds: Bounds) -> Result<(), FrameError> {
    if bounds.is_finite() && bounds.width >= 0.0 && bounds.height >= 0.0 {
        Ok(())
    } else {
        Err(FrameError::InvalidBounds(bounds))
    }
}

fn find_frame<'s>(snapshot: &'s mut Snapshot, frame_id: &str) -> Result<&'s mut Frame, FrameError> {
    snapshot
        .frame_mut(frame_id)
        .ok_or_else(|| FrameError::NotFound(frame_id.to_owned()))
}

fn unlocked_frame<'s>(
    snapshot: &'s mut Snapshot,
    frame_id: &str,
) -> Result<&'s mut Frame, FrameError> {
    let frame = find_frame(snapshot, frame_id)?;
    if frame.locked {
        return Err(FrameError::Locked(frame.id.clone()));
    }
    Ok(frame)
}

/// Makes `frame_id` the only frame of every listed component that exists. Returns the number of
/// new memberships.
fn attach(snapshot: &mut Snapshot, frame_id: &FrameId, component_ids: &[ComponentId]) -> usize {
    let mut added = 0;
    for component_id in component_ids {
        let Some(component) = snapshot.component_mut(component_id.as_str()) else {
            continue;
        };
        component.parent_frame_id = Some(frame_id.clone());
        for frame in &mut snapshot.frames {
            if &frame.id == frame_id {
                if frame.component_ids.insert(component_id.clone()) {
                    added += 1;
                }
            } else {
                frame.component_ids.remove(component_id);
            }
        }
    }
    added
}
