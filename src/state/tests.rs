// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};

use super::{StateUpdate, StoreConfig, VersionedStateStore};
use crate::autosave::{AutoSaveConfig, AutoSaveScheduler};
use crate::engine::{AddComponent, AddConnection, Instruction, UuidIds};
use crate::history::HistoryConfig;
use crate::model::{fixtures, Component, ComponentId, Snapshot};
use crate::store::MemoryGateway;

fn cid(value: &str) -> ComponentId {
    ComponentId::new(value).expect("component id")
}

#[fixture]
fn store() -> VersionedStateStore {
    VersionedStateStore::new(fixtures::pair(), StoreConfig::default())
}

fn add_component(store: &mut VersionedStateStore, id: &str) {
    store.update(|snapshot| {
        snapshot
            .components
            .push(Component::new(cid(id), "service", 0.0, 0.0));
    });
}

#[rstest]
fn commit_publishes_and_bumps_revision(mut store: VersionedStateStore) {
    let mut receiver = store.subscribe();
    assert_eq!(store.revision(), 0);

    add_component(&mut store, "c");

    assert_eq!(store.revision(), 1);
    assert!(store.get_state().contains_component("c"));
    assert!(receiver.has_changed().expect("sender alive"));
    assert!(receiver.borrow_and_update().contains_component("c"));
    assert!(store.can_undo());
}

#[rstest]
fn replace_swaps_the_whole_snapshot(mut store: VersionedStateStore) {
    store.commit(StateUpdate::Replace(fixtures::three_tier()));
    assert_eq!(*store.get_state(), fixtures::three_tier());

    assert!(store.undo());
    assert_eq!(*store.get_state(), fixtures::pair());
}

#[rstest]
fn previously_handed_out_snapshots_stay_untouched(mut store: VersionedStateStore) {
    let before = store.get_state();
    add_component(&mut store, "c");
    assert_eq!(*before, fixtures::pair());
    assert!(!Arc::ptr_eq(&before, &store.get_state()));
}

#[rstest]
fn commits_prune_orphan_connections(mut store: VersionedStateStore) {
    store.update(|snapshot| snapshot.components.retain(|c| c.id.as_str() != "b"));
    let state = store.get_state();
    assert_eq!(state.components.len(), 1);
    assert!(state.connections.is_empty());
}

#[rstest]
fn undo_redo_walk_history(mut store: VersionedStateStore) {
    assert!(!store.undo());
    assert!(!store.redo());

    add_component(&mut store, "c");
    add_component(&mut store, "d");
    assert!(store.undo());
    assert!(!store.get_state().contains_component("d"));
    assert!(store.can_redo());

    assert!(store.redo());
    assert!(store.get_state().contains_component("d"));
    assert!(!store.can_redo());
}

#[rstest]
fn new_commit_after_undo_invalidates_redo(mut store: VersionedStateStore) {
    add_component(&mut store, "c");
    assert!(store.undo());
    assert!(store.can_redo());

    add_component(&mut store, "d");

    assert!(!store.can_redo());
    assert!(!store.redo());
    assert!(store.get_state().contains_component("d"));
    assert!(!store.get_state().contains_component("c"));
}

#[test]
fn history_depth_follows_config() {
    let config = StoreConfig {
        history: HistoryConfig::new(3),
        ..StoreConfig::default()
    };
    let mut store = VersionedStateStore::new(Snapshot::default(), config);
    for index in 0..10 {
        add_component(&mut store, &format!("c{index}"));
    }
    let mut undone = 0;
    while store.undo() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(store.get_state().components.len(), 7);
}

#[rstest]
fn apply_batch_commits_once(mut store: VersionedStateStore) {
    let batch: Vec<Instruction> = vec![
        AddComponent::new("cache").alias("cache").into(),
        AddConnection::new("a", "cache").into(),
    ];
    let result = store.apply_batch(&batch);

    assert_eq!(result.added_components, 1);
    assert_eq!(result.added_connections, 1);
    assert_eq!(store.revision(), 1);
    assert_eq!(store.get_state().components.len(), 3);

    assert!(store.undo());
    assert_eq!(*store.get_state(), fixtures::pair());
}

#[rstest]
fn batch_without_changes_does_not_commit(mut store: VersionedStateStore) {
    let result = store.apply_batch(&[Instruction::remove_component("ghost")]);
    assert!(!result.has_changes());
    assert_eq!(result.skipped, 1);
    assert_eq!(store.revision(), 0);
    assert!(!store.can_undo());
}

#[rstest]
fn apply_batch_with_custom_allocator(mut store: VersionedStateStore) {
    let result = store.apply_batch_with(
        &[AddComponent::new("queue").alias("q").into()],
        &mut UuidIds,
    );
    let id = &result.alias_map["q"];
    assert!(id.starts_with("component-"));
    assert!(store.get_state().contains_component(id));
}

#[rstest]
fn reset_clears_history(mut store: VersionedStateStore) {
    add_component(&mut store, "c");
    store.reset(fixtures::three_tier());
    assert!(!store.can_undo());
    assert!(!store.can_redo());
    assert_eq!(*store.get_state(), fixtures::three_tier());
}

#[tokio::test(start_paused = true)]
async fn commits_feed_the_autosave_scheduler() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut store = VersionedStateStore::new(Snapshot::default(), StoreConfig::default());
    let scheduler = AutoSaveScheduler::spawn_on_current(
        gateway.clone(),
        store.subscribe(),
        AutoSaveConfig::default(),
    )
    .expect("runtime");
    store.attach_autosave(scheduler.clone());

    add_component(&mut store, "a");
    tokio::time::sleep(Duration::from_millis(1000)).await;
    add_component(&mut store, "b");
    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(gateway.save_count(), 1);
    let saved = gateway.saved().expect("saved");
    assert_eq!(saved.components.len(), 2);

    assert!(store.undo());
    assert!(scheduler.is_pending());
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(gateway.saved().map(|s| s.components.len()), Some(1));

    store.reset(Snapshot::default());
    assert!(!scheduler.is_pending());
}
