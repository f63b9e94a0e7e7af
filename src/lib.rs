// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! ArchiComm state core: versioned canvas state with bounded undo/redo, debounced autosave, an
//! instruction-batch engine and frame grouping.
//!
//! ```text
//! instruction batch ──► engine::apply_instructions ──► candidate snapshot
//!                                                          │ commit
//!                        frames::FrameOrganizer ──────────►├──► history (undo/redo)
//!                                                          ├──► watch channel (renderers)
//!                                                          └──► autosave ──► store::PersistenceGateway
//! ```

pub mod autosave;
pub mod config;
pub mod engine;
pub mod frames;
pub mod history;
pub mod model;
pub mod state;
pub mod store;

pub use autosave::{AutoSaveConfig, AutoSaveScheduler, SaveStatus};
pub use config::ArchiConfig;
pub use engine::{apply_instructions, Instruction, InstructionBatchResult};
pub use frames::{FrameError, FrameOrganizer};
pub use history::{HistoryConfig, HistoryManager};
pub use model::Snapshot;
pub use state::{StateUpdate, StoreConfig, VersionedStateStore};
pub use store::{PersistenceError, PersistenceGateway, SaveOptions};
