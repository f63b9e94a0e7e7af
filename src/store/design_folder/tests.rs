// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{DesignEnvelope, DesignFolder, WriteDurability, ENVELOPE_VERSION};
use crate::model::{fixtures, Component, ComponentId, ProjectId};
use crate::store::{PersistenceError, PersistenceGateway, ProjectMeta, SaveOptions};

struct FolderCtx {
    _tmp: TempDir,
    folder: DesignFolder,
}

#[fixture]
fn ctx() -> FolderCtx {
    let tmp = TempDir::new().expect("temp dir");
    let folder = DesignFolder::open(tmp.path().join("designs"), "shop").expect("folder");
    FolderCtx { _tmp: tmp, folder }
}

fn project(value: &str) -> ProjectId {
    ProjectId::new(value).expect("project id")
}

#[rstest]
#[case(WriteDurability::BestEffort)]
#[case(WriteDurability::Durable)]
#[tokio::test]
async fn save_then_load_round_trips(ctx: FolderCtx, #[case] durability: WriteDurability) {
    let folder = ctx.folder.clone().with_durability(durability);
    folder
        .save_design(&fixtures::three_tier(), &SaveOptions::default())
        .await
        .expect("save");

    let raw = std::fs::read_to_string(folder.design_path(&project("shop"), false)).expect("read");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(json["version"], ENVELOPE_VERSION);
    assert_eq!(json["projectId"], "shop");
    assert!(json["savedAt"].is_string());

    let loaded = folder.load_design(None).await.expect("load");
    assert_eq!(loaded, Some(fixtures::three_tier()));
}

#[rstest]
#[tokio::test]
async fn missing_design_loads_as_none(ctx: FolderCtx) {
    assert_eq!(ctx.folder.load_design(None).await.expect("load"), None);
    assert_eq!(ctx.folder.load_design(Some("other")).await.expect("load"), None);
}

#[rstest]
#[tokio::test]
async fn compressed_save_replaces_plain_file(ctx: FolderCtx) {
    let folder = &ctx.folder;
    folder
        .save_design(&fixtures::pair(), &SaveOptions::default())
        .await
        .expect("plain save");

    let options = SaveOptions {
        compress: true,
        ..SaveOptions::default()
    };
    folder
        .save_design(&fixtures::three_tier(), &options)
        .await
        .expect("compressed save");

    assert!(folder.design_path(&project("shop"), true).exists());
    assert!(!folder.design_path(&project("shop"), false).exists());

    let envelope = folder
        .read_envelope(&project("shop"))
        .await
        .expect("read")
        .expect("envelope");
    assert_eq!(envelope.snapshot, fixtures::three_tier());
    assert_eq!(
        folder.load_design(None).await.expect("load"),
        Some(fixtures::three_tier())
    );
}

#[rstest]
#[tokio::test]
async fn backup_keeps_previous_save(ctx: FolderCtx) {
    let folder = &ctx.folder;
    let options = SaveOptions::default();
    folder.save_design(&fixtures::pair(), &options).await.expect("first");
    folder
        .save_design(&fixtures::three_tier(), &options)
        .await
        .expect("second");

    let mut backup = folder.design_path(&project("shop"), false).into_os_string();
    backup.push(".bak");
    let raw = std::fs::read_to_string(backup).expect("backup exists");
    let envelope: DesignEnvelope = serde_json::from_str(&raw).expect("backup envelope");
    assert_eq!(envelope.snapshot, fixtures::pair());
}

#[rstest]
#[tokio::test]
async fn no_backup_when_disabled(ctx: FolderCtx) {
    let folder = &ctx.folder;
    let options = SaveOptions {
        backup: false,
        ..SaveOptions::default()
    };
    folder.save_design(&fixtures::pair(), &options).await.expect("first");
    folder.save_design(&fixtures::pair(), &options).await.expect("second");

    let mut backup = folder.design_path(&project("shop"), false).into_os_string();
    backup.push(".bak");
    assert!(!std::path::Path::new(&backup).exists());
}

#[rstest]
#[case("{ not json")]
#[case(r#"{"version": 99, "projectId": "shop", "savedAt": "2026-01-01T00:00:00Z", "snapshot": {}}"#)]
#[tokio::test]
async fn unreadable_design_loads_as_none(ctx: FolderCtx, #[case] contents: &str) {
    let path = ctx.folder.design_path(&project("shop"), false);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, contents).expect("write");
    assert_eq!(ctx.folder.load_design(None).await.expect("load"), None);
}

#[rstest]
#[tokio::test]
async fn load_repairs_unvalidated_saves(ctx: FolderCtx) {
    let folder = &ctx.folder;
    let mut snapshot = fixtures::pair();
    let duplicate = ComponentId::new("a").expect("component id");
    snapshot
        .components
        .push(Component::new(duplicate, "service", 5.0, 5.0));
    let options = SaveOptions {
        validate_data: false,
        ..SaveOptions::default()
    };
    folder.save_design(&snapshot, &options).await.expect("save");

    let loaded = folder.load_design(None).await.expect("load").expect("design");
    assert_eq!(loaded, fixtures::pair());
}

#[rstest]
#[tokio::test]
async fn failed_writes_leave_no_temp_files(ctx: FolderCtx) {
    let folder = &ctx.folder;
    let target = folder.design_path(&project("shop"), false);
    std::fs::create_dir_all(target.join("blocker")).expect("blocking dir");

    let options = SaveOptions {
        retries: 1,
        backup: false,
        ..SaveOptions::default()
    };
    let err = folder
        .save_design(&fixtures::pair(), &options)
        .await
        .expect_err("rename onto a directory fails");
    assert!(matches!(err, PersistenceError::Io { .. }), "{err}");

    let leftovers = std::fs::read_dir(folder.root())
        .expect("read root")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".archicomm.tmp."))
        .collect::<Vec<_>>();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[rstest]
#[tokio::test]
async fn project_meta_round_trips_and_projects_are_listed(ctx: FolderCtx) {
    let folder = &ctx.folder;
    let mut meta = ProjectMeta::new(project("shop"), "Shop");
    meta.description = "checkout flow".to_owned();
    folder.save_meta(&meta).await.expect("save meta");
    assert_eq!(
        folder.load_meta(&project("shop")).await.expect("load meta"),
        Some(meta)
    );
    assert_eq!(
        folder.load_meta(&project("billing")).await.expect("load meta"),
        None
    );

    assert!(folder.list_projects().await.expect("list").is_empty());
    folder
        .save_design(&fixtures::pair(), &SaveOptions::default())
        .await
        .expect("save");
    let billing = DesignFolder::new(folder.root(), project("billing"));
    let compressed = SaveOptions {
        compress: true,
        ..SaveOptions::default()
    };
    billing
        .save_design(&fixtures::pair(), &compressed)
        .await
        .expect("save");

    assert_eq!(
        folder.list_projects().await.expect("list"),
        vec![project("billing"), project("shop")]
    );
}

#[rstest]
#[tokio::test]
async fn invalid_project_id_is_rejected(ctx: FolderCtx) {
    assert!(ctx.folder.load_design(Some("a/b")).await.is_err());
}
