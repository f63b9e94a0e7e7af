// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The canonical canvas state.
//!
//! Every mutation, whether a manual edit, a frame operation or an instruction batch, goes through
//! [`VersionedStateStore::commit`]. A commit is synchronous: the new snapshot is normalized, pushed
//! into history and published before the call returns, so readers never see a half-applied
//! change.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::autosave::AutoSaveScheduler;
use crate::engine::{
    apply_instructions_with, IdAllocator, Instruction, InstructionBatchResult, SequentialIds,
};
use crate::frames::{FrameConfig, FrameOrganizer};
use crate::history::{HistoryConfig, HistoryManager};
use crate::model::Snapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StoreConfig {
    pub history: HistoryConfig,
    pub frames: FrameConfig,
}

/// A change to commit.
pub enum StateUpdate<'a> {
    /// Replaces the whole snapshot.
    Replace(Snapshot),
    /// Edits a copy of the current snapshot.
    Patch(Box<dyn FnOnce(&mut Snapshot) + 'a>),
}

impl fmt::Debug for StateUpdate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(_) => f.write_str("StateUpdate::Replace(..)"),
            Self::Patch(_) => f.write_str("StateUpdate::Patch(..)"),
        }
    }
}

pub struct VersionedStateStore {
    history: HistoryManager<Snapshot>,
    revision: u64,
    config: StoreConfig,
    publisher: watch::Sender<Arc<Snapshot>>,
    autosave: Option<AutoSaveScheduler>,
}

impl fmt::Debug for VersionedStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedStateStore")
            .field("revision", &self.revision)
            .field("history", &self.history)
            .field("autosave", &self.autosave.is_some())
            .finish()
    }
}

impl Default for VersionedStateStore {
    fn default() -> Self {
        Self::new(Snapshot::default(), StoreConfig::default())
    }
}

impl VersionedStateStore {
    pub fn new(mut initial: Snapshot, config: StoreConfig) -> Self {
        initial.prune_orphans();
        let initial = Arc::new(initial);
        let (publisher, _) = watch::channel(initial.clone());
        Self {
            history: HistoryManager::from_arc(initial, config.history),
            revision: 0,
            config,
            publisher,
            autosave: None,
        }
    }

    pub fn get_state(&self) -> Arc<Snapshot> {
        self.history.present().clone()
    }

    /// Incremented on every commit, undo, redo and reset.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Receives every newly published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.publisher.subscribe()
    }

    /// Routes dirty notifications to `scheduler`. Replaces any previously attached scheduler.
    pub fn attach_autosave(&mut self, scheduler: AutoSaveScheduler) {
        if let Some(previous) = self.autosave.replace(scheduler) {
            previous.shutdown();
        }
    }

    pub fn autosave(&self) -> Option<&AutoSaveScheduler> {
        self.autosave.as_ref()
    }

    pub fn history(&self) -> &HistoryManager<Snapshot> {
        &self.history
    }

    pub fn commit(&mut self, update: StateUpdate<'_>) -> Arc<Snapshot> {
        let mut next = match update {
            StateUpdate::Replace(snapshot) => snapshot,
            StateUpdate::Patch(patch) => {
                let mut snapshot = Snapshot::clone(self.history.present());
                patch(&mut snapshot);
                snapshot
            }
        };

        let pruned = next.prune_orphans();
        if !pruned.is_empty() {
            tracing::debug!(
                connections = pruned.connections.len(),
                memberships = pruned.memberships,
                "pruned orphans on commit"
            );
        }

        let next = Arc::new(next);
        self.history.push_arc(next.clone());
        self.revision += 1;
        tracing::debug!(
            revision = self.revision,
            components = next.components.len(),
            connections = next.connections.len(),
            undo_depth = self.history.undo_depth(),
            "state committed"
        );
        self.publish(next.clone());
        self.mark_dirty();
        next
    }

    pub fn replace(&mut self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.commit(StateUpdate::Replace(snapshot))
    }

    pub fn update(&mut self, patch: impl FnOnce(&mut Snapshot)) -> Arc<Snapshot> {
        self.commit(StateUpdate::Patch(Box::new(patch)))
    }

    /// Applies `instructions` to the current state and commits the result if anything changed.
    pub fn apply_batch(&mut self, instructions: &[Instruction]) -> InstructionBatchResult {
        self.apply_batch_with(instructions, &mut SequentialIds::default())
    }

    pub fn apply_batch_with(
        &mut self,
        instructions: &[Instruction],
        allocator: &mut dyn IdAllocator,
    ) -> InstructionBatchResult {
        let current = self.get_state();
        let (candidate, result) = apply_instructions_with(&current, instructions, allocator);
        if result.has_changes() {
            self.replace(candidate);
        }
        result
    }

    pub fn undo(&mut self) -> bool {
        let Some(state) = self.history.undo() else {
            return false;
        };
        self.revision += 1;
        tracing::debug!(revision = self.revision, redo_depth = self.history.redo_depth(), "undo");
        self.publish(state);
        self.mark_dirty();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(state) = self.history.redo() else {
            return false;
        };
        self.revision += 1;
        tracing::debug!(revision = self.revision, undo_depth = self.history.undo_depth(), "redo");
        self.publish(state);
        self.mark_dirty();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Replaces the state and forgets all history, e.g. after loading a design. Does not mark the
    /// store dirty.
    pub fn reset(&mut self, mut snapshot: Snapshot) {
        snapshot.prune_orphans();
        let snapshot = Arc::new(snapshot);
        self.history.reset(snapshot.clone());
        self.revision += 1;
        self.publish(snapshot);
    }

    pub fn frames(&mut self) -> FrameOrganizer<'_> {
        let config = self.config.frames;
        FrameOrganizer::new(self, config)
    }

    fn publish(&self, state: Arc<Snapshot>) {
        self.publisher.send_replace(state);
    }

    fn mark_dirty(&self) {
        if let Some(autosave) = &self.autosave {
            autosave.mark_dirty();
        }
    }
}

#[cfg(test)]
mod tests;
