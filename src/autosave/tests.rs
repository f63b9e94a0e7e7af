// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use super::{AutoSaveConfig, AutoSaveError, AutoSaveScheduler, SaveStatus};
use crate::model::{fixtures, Snapshot};
use crate::store::{MemoryGateway, PersistenceGateway};

struct Harness {
    gateway: Arc<MemoryGateway>,
    state: watch::Sender<Arc<Snapshot>>,
    scheduler: AutoSaveScheduler,
}

fn harness(config: AutoSaveConfig) -> Harness {
    let gateway = Arc::new(MemoryGateway::new());
    let (state, receiver) = watch::channel(Arc::new(Snapshot::default()));
    let scheduler = AutoSaveScheduler::spawn_on_current(
        gateway.clone() as Arc<dyn PersistenceGateway>,
        receiver,
        config,
    )
    .expect("runtime");
    Harness {
        gateway,
        state,
        scheduler,
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[tokio::test(start_paused = true)]
async fn saves_once_after_the_debounce_window() {
    let h = harness(AutoSaveConfig::default());
    assert_eq!(h.scheduler.status(), SaveStatus::Idle);

    h.scheduler.mark_dirty();
    assert!(h.scheduler.is_pending());
    sleep(ms(1999)).await;
    assert_eq!(h.gateway.save_count(), 0);

    sleep(ms(2)).await;
    assert_eq!(h.gateway.save_count(), 1);
    assert!(!h.scheduler.is_pending());
    assert!(!h.scheduler.is_dirty());
    assert!(matches!(h.scheduler.status(), SaveStatus::Saved { .. }));
}

#[tokio::test(start_paused = true)]
async fn new_mutations_restart_the_timer() {
    let h = harness(AutoSaveConfig::default());
    h.scheduler.mark_dirty();
    sleep(ms(1500)).await;
    h.scheduler.mark_dirty();
    sleep(ms(1500)).await;
    assert_eq!(h.gateway.save_count(), 0);
    assert!(h.scheduler.is_pending());

    sleep(ms(600)).await;
    assert_eq!(h.gateway.save_count(), 1);
    assert_eq!(h.scheduler.save_count(), 1);

    sleep(ms(10_000)).await;
    assert_eq!(h.gateway.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn force_save_cancels_the_pending_timer() {
    let h = harness(AutoSaveConfig::default());
    h.scheduler.mark_dirty();
    h.scheduler.force_save().await.expect("save");
    assert_eq!(h.gateway.save_count(), 1);
    assert!(!h.scheduler.is_pending());

    sleep(ms(5000)).await;
    assert_eq!(h.gateway.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn saves_the_state_current_at_fire_time() {
    let h = harness(AutoSaveConfig::default());
    h.scheduler.mark_dirty();
    h.state.send_replace(Arc::new(fixtures::pair()));
    sleep(ms(2100)).await;
    assert_eq!(h.gateway.saved(), Some(fixtures::pair()));
}

#[tokio::test(start_paused = true)]
async fn failures_are_reported_and_not_retried() {
    let h = harness(AutoSaveConfig::default());
    h.gateway.fail_next(1);
    h.scheduler.mark_dirty();
    sleep(ms(2100)).await;

    assert!(matches!(h.scheduler.status(), SaveStatus::Error { .. }));
    assert!(h.scheduler.is_dirty());
    sleep(ms(10_000)).await;
    assert_eq!(h.gateway.save_count(), 0);

    h.scheduler.mark_dirty();
    sleep(ms(2100)).await;
    assert_eq!(h.gateway.save_count(), 1);
    assert!(matches!(h.scheduler.status(), SaveStatus::Saved { .. }));
}

#[tokio::test(start_paused = true)]
async fn force_save_surfaces_the_error() {
    let h = harness(AutoSaveConfig::default());
    h.gateway.set_fail_always(true);
    let err = h.scheduler.force_save().await.expect_err("save fails");
    assert!(matches!(err, AutoSaveError::Persistence(_)));
    match h.scheduler.status() {
        SaveStatus::Error { message } => assert!(message.contains("offline"), "{message}"),
        other => panic!("unexpected status {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn status_reports_saving_while_the_gateway_is_busy() {
    let h = harness(AutoSaveConfig::default());
    let mut statuses = h.scheduler.subscribe_status();
    h.gateway.block_saves();
    h.scheduler.mark_dirty();
    sleep(ms(2100)).await;
    assert_eq!(h.scheduler.status(), SaveStatus::Saving);

    h.gateway.release_saves();
    statuses
        .wait_for(|status| matches!(status, SaveStatus::Saved { .. }))
        .await
        .expect("status channel open");
    assert_eq!(h.gateway.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn disabled_scheduler_only_tracks_dirtiness() {
    let h = harness(AutoSaveConfig {
        enabled: false,
        ..AutoSaveConfig::default()
    });
    h.scheduler.mark_dirty();
    assert!(h.scheduler.is_dirty());
    assert!(!h.scheduler.is_pending());
    sleep(ms(5000)).await;
    assert_eq!(h.gateway.save_count(), 0);

    h.scheduler.force_save().await.expect("save");
    assert_eq!(h.gateway.save_count(), 1);
    assert!(!h.scheduler.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_drops_the_pending_save() {
    let h = harness(AutoSaveConfig::default());
    h.scheduler.mark_dirty();
    h.scheduler.shutdown();
    assert!(!h.scheduler.is_pending());
    sleep(ms(5000)).await;
    assert_eq!(h.gateway.save_count(), 0);
}

#[test]
fn requires_a_runtime() {
    let (_state, receiver) = watch::channel(Arc::new(Snapshot::default()));
    let result = AutoSaveScheduler::spawn_on_current(
        Arc::new(MemoryGateway::new()),
        receiver,
        AutoSaveConfig::default(),
    );
    assert!(matches!(result, Err(AutoSaveError::NoRuntime)));
}

#[test]
fn config_defaults() {
    let config = AutoSaveConfig::default();
    assert_eq!(config.debounce(), ms(2000));
    assert!(config.enabled);
}
