// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Debounced saving.
//!
//! ```text
//! mark_dirty ──► cancel previous token ──► spawn timer(debounce)
//!                                               │ fires
//!                                               ▼
//!                       save(state current at fire time)
//!                       status: Saving ──► Saved { at } | Error { message }
//! ```
//!
//! At most one timer is live: every `mark_dirty` and `force_save` cancels the pending one through
//! its [`CancellationToken`]. Failed saves are not retried until the next `mark_dirty` or
//! `force_save`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::model::Snapshot;
use crate::store::{PersistenceError, PersistenceGateway, SaveOptions};

pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AutoSaveConfig {
    pub debounce_ms: u64,
    /// When false, mutations are only recorded as dirty; saving needs `force_save`.
    pub enabled: bool,
    pub save: SaveOptions,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            enabled: true,
            save: SaveOptions::default(),
        }
    }
}

impl AutoSaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved {
        at: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AutoSaveError {
    #[error("autosave needs a running tokio runtime")]
    NoRuntime,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

struct Pending {
    generation: u64,
    token: CancellationToken,
}

struct Inner {
    gateway: Arc<dyn PersistenceGateway>,
    state: watch::Receiver<Arc<Snapshot>>,
    config: AutoSaveConfig,
    runtime: Handle,
    pending: Mutex<Option<Pending>>,
    generation: AtomicU64,
    status: watch::Sender<SaveStatus>,
    dirty: AtomicBool,
    saves: AtomicU64,
    save_lock: tokio::sync::Mutex<()>,
}

/// Debounced save trigger for one store.
///
/// Clones share the same timer and status.
#[derive(Clone)]
pub struct AutoSaveScheduler {
    inner: Arc<Inner>,
}

impl fmt::Debug for AutoSaveScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSaveScheduler")
            .field("config", &self.inner.config)
            .field("status", &*self.inner.status.borrow())
            .field("pending", &self.is_pending())
            .field("saves", &self.save_count())
            .finish()
    }
}

impl AutoSaveScheduler {
    /// `state` is read when a save runs, so the saved snapshot is always the latest one.
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        state: watch::Receiver<Arc<Snapshot>>,
        config: AutoSaveConfig,
        runtime: Handle,
    ) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                gateway,
                state,
                config,
                runtime,
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                status,
                dirty: AtomicBool::new(false),
                saves: AtomicU64::new(0),
                save_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Like [`new`](Self::new), using the runtime the caller is running on.
    pub fn spawn_on_current(
        gateway: Arc<dyn PersistenceGateway>,
        state: watch::Receiver<Arc<Snapshot>>,
        config: AutoSaveConfig,
    ) -> Result<Self, AutoSaveError> {
        let runtime = Handle::try_current().map_err(|_| AutoSaveError::NoRuntime)?;
        Ok(Self::new(gateway, state, config, runtime))
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.inner.config
    }

    /// Records a mutation and restarts the debounce timer.
    pub fn mark_dirty(&self) {
        let inner = &self.inner;
        inner.dirty.store(true, Ordering::SeqCst);
        if !inner.config.enabled {
            return;
        }

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        {
            let mut pending = inner.pending.lock().expect("autosave lock poisoned");
            let previous = pending.replace(Pending {
                generation,
                token: token.clone(),
            });
            if let Some(previous) = previous {
                previous.token.cancel();
            }
        }

        let deadline = tokio::time::Instant::now() + inner.config.debounce();
        let task = Arc::clone(inner);
        inner.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => {}
            }
            if !task.claim(generation) {
                return;
            }
            // Errors end up in the status channel.
            let _ = task.save().await;
        });
    }

    /// Cancels the pending timer and saves right away.
    pub async fn force_save(&self) -> Result<(), AutoSaveError> {
        self.cancel_pending();
        self.inner.save().await.map_err(AutoSaveError::from)
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.inner.saves.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.inner
            .pending
            .lock()
            .expect("autosave lock poisoned")
            .is_some()
    }

    /// True when something changed since the last successful save.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Cancels the pending timer. A save that already started runs to completion.
    pub fn shutdown(&self) {
        self.cancel_pending();
    }

    fn cancel_pending(&self) {
        let previous = self
            .inner
            .pending
            .lock()
            .expect("autosave lock poisoned")
            .take();
        if let Some(previous) = previous {
            previous.token.cancel();
        }
    }
}

impl Inner {
    /// Clears the pending slot if it still belongs to `generation`.
    fn claim(&self, generation: u64) -> bool {
        let mut pending = self.pending.lock().expect("autosave lock poisoned");
        match pending.as_ref() {
            Some(current) if current.generation == generation => {
                *pending = None;
                true
            }
            _ => false,
        }
    }

    async fn save(&self) -> Result<(), PersistenceError> {
        let _serial = self.save_lock.lock().await;
        let snapshot = self.state.borrow().clone();
        self.dirty.store(false, Ordering::SeqCst);
        self.status.send_replace(SaveStatus::Saving);

        match self.gateway.save_design(&snapshot, &self.config.save).await {
            Ok(()) => {
                let count = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
                let at = Utc::now();
                tracing::info!(
                    saves = count,
                    components = snapshot.components.len(),
                    "autosave complete"
                );
                self.status.send_replace(SaveStatus::Saved { at });
                Ok(())
            }
            Err(err) => {
                self.dirty.store(true, Ordering::SeqCst);
                tracing::warn!(error = %err, "autosave failed");
                self.status.send_replace(SaveStatus::Error {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests;
