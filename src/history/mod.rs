// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bounded undo/redo history over immutable snapshots.
//!
//! ```text
//! push(s3)           past: [s0, s1, s2]   present: s3   future: []
//! undo() x2          past: [s0]           present: s1   future: [s3, s2]
//! push(s4)           past: [s0, s1]       present: s4   future: []      (branch dropped)
//! ```
//!
//! Snapshots are shared through `Arc`, so moving the pointer never clones a snapshot. The past
//! stack is bounded by [`HistoryConfig::max_depth`]; the oldest entry is evicted first. The future
//! stack is never evicted, only cleared when a new state is pushed.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_DEPTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HistoryConfig {
    /// Maximum number of undoable states kept on the past stack.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

impl HistoryConfig {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

/// Past/present/future snapshot stacks.
///
/// Invariants:
/// - `past.len() <= config.max_depth` after every operation.
/// - `future` is empty right after [`push_state`](Self::push_state).
/// - `present` always holds the state the caller should display.
pub struct HistoryManager<T> {
    past: VecDeque<Arc<T>>,
    present: Arc<T>,
    future: Vec<Arc<T>>,
    config: HistoryConfig,
    evicted: u64,
}

impl<T> fmt::Debug for HistoryManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryManager")
            .field("past_depth", &self.past.len())
            .field("future_depth", &self.future.len())
            .field("evicted", &self.evicted)
            .field("config", &self.config)
            .finish()
    }
}

impl<T> HistoryManager<T> {
    pub fn new(initial: T, config: HistoryConfig) -> Self {
        Self::from_arc(Arc::new(initial), config)
    }

    pub fn from_arc(initial: Arc<T>, config: HistoryConfig) -> Self {
        Self {
            past: VecDeque::new(),
            present: initial,
            future: Vec::new(),
            config,
            evicted: 0,
        }
    }

    /// Makes `state` the present, moving the old present onto the past stack and dropping any
    /// redo branch.
    pub fn push_state(&mut self, state: T) {
        self.push_arc(Arc::new(state));
    }

    pub fn push_arc(&mut self, state: Arc<T>) {
        self.future.clear();
        let previous = std::mem::replace(&mut self.present, state);
        if self.config.max_depth == 0 {
            self.evicted += 1;
            return;
        }
        self.past.push_back(previous);
        while self.past.len() > self.config.max_depth {
            self.past.pop_front();
            self.evicted += 1;
        }
    }

    /// Steps back one state. Returns the new present, or `None` at the oldest retained state.
    pub fn undo(&mut self) -> Option<Arc<T>> {
        let previous = self.past.pop_back()?;
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push(current);
        Some(self.present.clone())
    }

    /// Steps forward one state. Returns the new present, or `None` when nothing was undone.
    pub fn redo(&mut self) -> Option<Arc<T>> {
        let next = self.future.pop()?;
        let current = std::mem::replace(&mut self.present, next);
        self.past.push_back(current);
        Some(self.present.clone())
    }

    pub fn present(&self) -> &Arc<T> {
        &self.present
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Number of states dropped off the past stack since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Replaces the present and forgets all past and future states.
    pub fn reset(&mut self, state: Arc<T>) {
        self.past.clear();
        self.future.clear();
        self.present = state;
    }
}
