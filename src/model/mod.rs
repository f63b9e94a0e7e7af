// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A [`Snapshot`] bundles every component, connection and frame on the canvas together with the
//! view state (layers, selection, active tool, grid) that undo/redo restores as one unit.

pub mod component;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod frame;
pub mod ids;
pub mod snapshot;

pub use component::{
    Component, Connection, ConnectionDirection, DEFAULT_COMPONENT_HEIGHT,
    DEFAULT_COMPONENT_WIDTH, DEFAULT_CONNECTION_TYPE,
};
pub use frame::{Bounds, Frame, DEFAULT_FRAME_COLOR};
pub use ids::{ComponentId, ConnectionId, FrameId, Id, IdError, LayerId, ProjectId};
pub use snapshot::{ActiveTool, GridConfig, Layer, PruneReport, Selection, Snapshot};
