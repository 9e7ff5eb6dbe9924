// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nova_core::test_support::MissionBuilder;
use nova_core::{FakeClock, SequentialIdGen};
use serde_json::json;

fn store(dir: &std::path::Path) -> MissionStore<FakeClock, SequentialIdGen> {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    MissionStore::new(StorePaths::new(dir), clock, SequentialIdGen::new("m"))
}

fn mission(id: &str, user: &str) -> Mission {
    MissionBuilder::new(id, user)
        .node(json!({"id": "t", "label": "Go", "type": "manual-trigger"}))
        .build()
}

#[tokio::test]
async fn upsert_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    store.upsert_mission(mission("m1", "alice"), "alice").await.unwrap();
    let loaded = store.load_missions("alice").await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "m1");
}

#[tokio::test]
async fn upsert_bumps_version_and_updated_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    let saved = store.upsert_mission(mission("m1", "alice"), "alice").await.unwrap();
    assert_eq!(saved.version, 2);
    let again = store.upsert_mission(saved, "alice").await.unwrap();
    assert_eq!(again.version, 3);
}

#[tokio::test]
async fn upsert_preserves_execution_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    store.upsert_mission(mission("m1", "alice"), "alice").await.unwrap();
    store
        .record_run_outcome(
            "m1",
            "alice",
            RunOutcome {
                status: RunStatus::Success,
                ran_at: Utc::now(),
                day_stamp: Some("2026-03-14".to_string()),
                clear_override: false,
            },
        )
        .await
        .unwrap();

    // Re-save a builder-fresh copy with no execution metadata.
    store.upsert_mission(mission("m1", "alice"), "alice").await.unwrap();

    let loaded = store.load_missions("alice").await.unwrap();
    assert_eq!(loaded[0].run_count, 1);
    assert_eq!(loaded[0].success_count, 1);
    assert_eq!(
        loaded[0].last_sent_local_date.as_deref(),
        Some("2026-03-14")
    );
    assert!(loaded[0].last_run_at.is_some());
}

#[tokio::test]
async fn upsert_rejects_cross_user_mission() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    let err = store
        .upsert_mission(mission("m1", "mallory"), "alice")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_user");
    assert!(store.load_missions("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn writes_for_one_user_do_not_touch_another() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    store.upsert_mission(mission("m1", "alice"), "alice").await.unwrap();
    store.upsert_mission(mission("m2", "bob"), "bob").await.unwrap();

    let alice = store.load_missions("alice").await.unwrap();
    let bob = store.load_missions("bob").await.unwrap();
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].id, "m1");
    assert_eq!(bob.len(), 1);
    assert_eq!(bob[0].id, "m2");
}

#[tokio::test]
async fn delete_tombstones_and_scrubs() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    store.upsert_mission(mission("m1", "alice"), "alice").await.unwrap();
    let outcome = store.delete_mission("m1", "alice").await.unwrap();
    assert!(outcome.ok && outcome.deleted);
    assert_eq!(outcome.reason, DeleteReason::Deleted);

    assert!(store.load_missions("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_missing_mission_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    let outcome = store.delete_mission("ghost", "alice").await.unwrap();
    assert!(outcome.ok && !outcome.deleted);
    assert_eq!(outcome.reason, DeleteReason::NotFound);
}

#[tokio::test]
async fn delete_with_invalid_user_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    let outcome = store.delete_mission("m1", "!!!").await.unwrap();
    assert!(!outcome.ok);
    assert_eq!(outcome.reason, DeleteReason::InvalidUser);
}

#[tokio::test]
async fn concurrent_upserts_serialize_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let store = std::sync::Arc::new(store(dir.path()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .upsert_mission(mission(&format!("m{i}"), "alice"), "alice")
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let loaded = store.load_missions("alice").await.unwrap();
    assert_eq!(loaded.len(), 8);
}

#[tokio::test]
async fn legacy_schedules_migrate_once() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = dir.path().join(".agent/schedules.json");
    std::fs::create_dir_all(legacy.parent().unwrap()).unwrap();
    std::fs::write(
        &legacy,
        serde_json::to_vec(&json!([
            {
                "id": "sched-1",
                "userId": "alice",
                "label": "BTC digest",
                "prompt": "Summarize BTC news",
                "time": "09:00",
                "timezone": "America/New_York",
                "integration": "telegram",
                "chatIds": ["123"],
            },
            {"id": "sched-2", "userId": "bob", "label": "Other", "prompt": "x"},
        ]))
        .unwrap(),
    )
    .unwrap();

    let store = store(dir.path());
    let loaded = store.load_missions("alice").await.unwrap();
    assert_eq!(loaded.len(), 1);
    let migrated = &loaded[0];
    assert_eq!(migrated.id, "sched-1");
    assert_eq!(migrated.integration.as_deref(), Some("telegram"));
    assert!(migrated.schedule_trigger().is_some());
    assert_eq!(migrated.timezone(), "America/New_York");

    // Bob's schedule was not pulled into Alice's store.
    assert!(loaded.iter().all(|m| m.user_id == "alice"));
}

#[tokio::test]
async fn tombstoned_ids_are_never_reimported() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = dir.path().join(".agent/schedules.json");
    std::fs::create_dir_all(legacy.parent().unwrap()).unwrap();
    std::fs::write(
        &legacy,
        serde_json::to_vec(&json!([
            {"id": "sched-1", "userId": "alice", "label": "Digest", "prompt": "p"},
        ]))
        .unwrap(),
    )
    .unwrap();

    // First store instance migrates, then the user deletes the mission.
    {
        let store = store(dir.path());
        assert_eq!(store.load_missions("alice").await.unwrap().len(), 1);
        store.delete_mission("sched-1", "alice").await.unwrap();
    }

    // A fresh process (fresh in-memory migrated set) must not re-import.
    let store = store(dir.path());
    assert!(store.load_missions("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn build_mission_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());

    let mission = store.build_mission(NewMission {
        user_id: "alice".to_string(),
        label: "Daily digest".to_string(),
        timezone: Some("Europe/Berlin".to_string()),
        ..NewMission::default()
    });
    assert_eq!(mission.id, "m-1");
    assert_eq!(mission.version, 1);
    assert_eq!(mission.settings.timezone, "Europe/Berlin");
    assert_eq!(mission.status, MissionStatus::Active);
}

#[tokio::test]
async fn load_scrubs_cross_user_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.upsert_mission(mission("m1", "alice"), "alice").await.unwrap();

    // Corrupt the file by hand with a foreign mission.
    let path = StorePaths::new(dir.path()).missions_file("alice").unwrap();
    let mut file: MissionFile =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    file.missions.push(mission("m2", "mallory"));
    std::fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();

    let loaded = store.load_missions("alice").await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "m1");
}
