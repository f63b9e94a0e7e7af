// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use super::{prepare_for_save, PersistenceError, PersistenceGateway, SaveOptions};
use crate::model::Snapshot;

const DEFAULT_PROJECT: &str = "default";

#[derive(Debug, Default)]
struct MemoryState {
    designs: HashMap<String, Snapshot>,
    saves: u64,
    fail_next: u32,
    fail_always: bool,
}

/// Keeps designs in memory.
///
/// Saves can be made to fail or to block until released, which is what the autosave tests use to
/// observe the `saving` state.
#[derive(Debug)]
pub struct MemoryGateway {
    project: String,
    state: Mutex<MemoryState>,
    open: watch::Sender<bool>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::for_project(DEFAULT_PROJECT)
    }

    pub fn for_project(project: impl Into<String>) -> Self {
        let (open, _) = watch::channel(true);
        Self {
            project: project.into(),
            state: Mutex::new(MemoryState::default()),
            open,
        }
    }

    pub fn insert(&self, project: impl Into<String>, snapshot: Snapshot) {
        self.lock().designs.insert(project.into(), snapshot);
    }

    /// The next `count` saves fail with [`PersistenceError::Unavailable`].
    pub fn fail_next(&self, count: u32) {
        self.lock().fail_next = count;
    }

    pub fn set_fail_always(&self, fail: bool) {
        self.lock().fail_always = fail;
    }

    /// Holds every save until [`release_saves`](Self::release_saves) is called.
    pub fn block_saves(&self) {
        self.open.send_replace(false);
    }

    pub fn release_saves(&self) {
        self.open.send_replace(true);
    }

    /// Number of saves that reached storage.
    pub fn save_count(&self) -> u64 {
        self.lock().saves
    }

    pub fn saved(&self) -> Option<Snapshot> {
        self.lock().designs.get(&self.project).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory gateway lock poisoned")
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn save_design(
        &self,
        snapshot: &Snapshot,
        options: &SaveOptions,
    ) -> Result<(), PersistenceError> {
        let mut open = self.open.subscribe();
        let _ = open.wait_for(|open| *open).await;

        let repaired = prepare_for_save(self, snapshot, options)?;
        let snapshot = repaired.unwrap_or_else(|| snapshot.clone());

        let mut state = self.lock();
        if state.fail_always {
            return Err(PersistenceError::Unavailable("memory gateway offline".into()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(PersistenceError::Unavailable("injected save failure".into()));
        }
        state.designs.insert(self.project.clone(), snapshot);
        state.saves += 1;
        Ok(())
    }

    async fn load_design(
        &self,
        project_id: Option<&str>,
    ) -> Result<Option<Snapshot>, PersistenceError> {
        let project = project_id.unwrap_or(&self.project);
        let Some(snapshot) = self.lock().designs.get(project).cloned() else {
            return Ok(None);
        };
        let repaired = self.repair_data(snapshot);
        if !self.validate_data(&repaired).is_valid() {
            tracing::warn!(project, "stored design is corrupt; ignoring it");
            return Ok(None);
        }
        Ok(Some(repaired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    #[tokio::test]
    async fn save_then_load_returns_the_design() {
        let gateway = MemoryGateway::new();
        gateway
            .save_design(&fixtures::three_tier(), &SaveOptions::default())
            .await
            .expect("save");
        let loaded = gateway.load_design(None).await.expect("load");
        assert_eq!(loaded, Some(fixtures::three_tier()));
        assert_eq!(gateway.save_count(), 1);
    }

    #[tokio::test]
    async fn load_of_unknown_project_is_none() {
        let gateway = MemoryGateway::new();
        assert_eq!(gateway.load_design(Some("nope")).await.expect("load"), None);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let gateway = MemoryGateway::new();
        gateway.fail_next(1);
        let options = SaveOptions::default();
        assert!(gateway.save_design(&fixtures::pair(), &options).await.is_err());
        assert!(gateway.save_design(&fixtures::pair(), &options).await.is_ok());
        assert_eq!(gateway.save_count(), 1);
    }

    #[tokio::test]
    async fn validation_repairs_orphans_before_storing() {
        let gateway = MemoryGateway::new();
        let mut snapshot = fixtures::pair();
        snapshot.components.pop();
        gateway
            .save_design(&snapshot, &SaveOptions::default())
            .await
            .expect("save");
        let saved = gateway.saved().expect("saved");
        assert!(saved.connections.is_empty());
    }
}
