// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Within the pending window, exactly one identical build
//! request starts; the rest observe pending or the finalized result.

use nova_core::FakeClock;
use nova_storage::{IdempotencyStore, ReserveInput, ReserveOutcome, StorePaths};
use serde_json::json;
use std::time::Duration;

fn build_input() -> ReserveInput {
    ReserveInput {
        user_context_id: "hud-user:42".to_string(),
        prompt: "Every morning send me the BTC price".to_string(),
        deploy: true,
        timezone: "America/New_York".to_string(),
        enabled: true,
    }
}

#[test]
fn exactly_one_identical_request_starts() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(5_000_000);
    let store = IdempotencyStore::new(StorePaths::new(dir.path()), clock);

    let mut started = 0;
    let mut pending = 0;
    for _ in 0..5 {
        match store.reserve(&build_input()).unwrap() {
            ReserveOutcome::Started { .. } => started += 1,
            ReserveOutcome::Pending { retry_after_ms, .. } => {
                assert!((250..=4000).contains(&retry_after_ms));
                pending += 1;
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(pending, 4);
}

#[test]
fn finalized_result_is_replayed_to_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(5_000_000);
    let store = IdempotencyStore::new(StorePaths::new(dir.path()), clock.clone());

    let started = store.reserve(&build_input()).unwrap();
    store
        .finalize(
            "hud-user:42",
            started.key(),
            true,
            Some(json!({"missionId": "m-77"})),
            None,
        )
        .unwrap();

    for _ in 0..3 {
        let outcome = store.reserve(&build_input()).unwrap();
        let ReserveOutcome::Completed { result, .. } = outcome else {
            panic!("expected completed replay");
        };
        assert_eq!(result["missionId"], "m-77");
    }

    // After the finalized TTL, the fingerprint is fresh again.
    clock.advance(Duration::from_secs(301));
    assert!(matches!(
        store.reserve(&build_input()).unwrap(),
        ReserveOutcome::Started { .. }
    ));
}

#[test]
fn different_users_never_share_a_reservation() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(5_000_000);
    let store = IdempotencyStore::new(StorePaths::new(dir.path()), clock);

    let alice = store.reserve(&build_input()).unwrap();
    let mut bob_input = build_input();
    bob_input.user_context_id = "hud-user:43".to_string();
    let bob = store.reserve(&bob_input).unwrap();

    assert!(matches!(alice, ReserveOutcome::Started { .. }));
    assert!(matches!(bob, ReserveOutcome::Started { .. }));
    assert_ne!(alice.key(), bob.key());
}
