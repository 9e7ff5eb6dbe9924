// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenants never share stores, sessions, or transcripts.

use nova_core::test_support::MissionBuilder;
use nova_core::{FakeClock, SequentialIdGen};
use nova_storage::{
    MissionStore, SessionKeyInput, SessionPolicy, SessionStore, StorePaths,
};
use serde_json::json;

fn clock() -> FakeClock {
    let clock = FakeClock::new();
    clock.set_epoch_ms(9_000_000);
    clock
}

#[tokio::test]
async fn mission_writes_by_one_user_never_touch_another() {
    let dir = tempfile::tempdir().unwrap();
    let store = MissionStore::new(
        StorePaths::new(dir.path()),
        clock(),
        SequentialIdGen::new("m"),
    );

    let alice_mission = MissionBuilder::new("m1", "alice")
        .node(json!({"id": "t", "label": "Go", "type": "manual-trigger"}))
        .build();
    let bob_mission = MissionBuilder::new("m1", "bob")
        .node(json!({"id": "t", "label": "Go", "type": "manual-trigger"}))
        .build();

    store.upsert_mission(alice_mission, "alice").await.unwrap();
    store.upsert_mission(bob_mission, "bob").await.unwrap();

    // Same mission id, two files, no bleed-through in either direction.
    store.delete_mission("m1", "alice").await.unwrap();
    assert!(store.load_missions("alice").await.unwrap().is_empty());
    assert_eq!(store.load_missions("bob").await.unwrap().len(), 1);

    let paths = StorePaths::new(dir.path());
    assert!(paths.missions_file("bob").unwrap().exists());
}

#[tokio::test]
async fn cross_user_upsert_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = MissionStore::new(
        StorePaths::new(dir.path()),
        clock(),
        SequentialIdGen::new("m"),
    );

    let mission = MissionBuilder::new("m1", "bob")
        .node(json!({"id": "t", "label": "Go", "type": "manual-trigger"}))
        .build();
    let err = store.upsert_mission(mission, "alice").await.unwrap_err();
    assert_eq!(err.code(), "invalid_user");
}

#[test]
fn same_hint_different_contexts_get_distinct_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(
        StorePaths::new(dir.path()),
        clock(),
        SessionPolicy::default(),
    );

    let input_for = |user: &str| SessionKeyInput {
        session_key_hint: Some("agent:nova:shared".to_string()),
        source: "hud".to_string(),
        agent: "nova".to_string(),
        user_context_id: Some(user.to_string()),
        ..SessionKeyInput::default()
    };

    let alice = store.resolve_session_context(&input_for("alice")).unwrap();
    let bob = store.resolve_session_context(&input_for("bob")).unwrap();

    assert_eq!(alice.session_key, bob.session_key);
    assert_ne!(alice.entry.session_id, bob.entry.session_id);
    assert_ne!(alice.user_context_id, bob.user_context_id);
}

#[test]
fn transcripts_are_scoped_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(
        StorePaths::new(dir.path()),
        clock(),
        SessionPolicy::default(),
    );

    store
        .append_transcript_turn("hud-user:alice", "s1", "user", "alice secret", None)
        .unwrap();
    store
        .append_transcript_turn("hud-user:bob", "s1", "user", "bob secret", None)
        .unwrap();

    let alice = store.load_transcript("s1", Some("hud-user:alice")).unwrap();
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].content, "alice secret");

    let paths = StorePaths::new(dir.path());
    assert!(paths.transcript_file("hud-user:alice", "s1").unwrap().exists());
    assert!(paths.transcript_file("hud-user:bob", "s1").unwrap().exists());
}
