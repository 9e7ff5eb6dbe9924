// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent runs for one user hit the per-user inflight cap.

use crate::prelude::*;
use nova_core::context::RunSource;
use nova_core::test_support::MissionBuilder;
use nova_engine::{ExecuteMissionInput, GuardConfig};
use serde_json::json;
use std::time::Duration;

fn slow_mission(id: &str) -> nova_core::mission::Mission {
    MissionBuilder::new(id, "alice")
        .integration("novachat")
        .node(json!({"id": "t", "label": "Go", "type": "manual-trigger"}))
        .node(json!({"id": "w", "label": "Wait", "type": "wait", "durationMs": 400}))
        .connect("t", "main", "w")
        .build()
}

#[tokio::test]
async fn second_run_is_rejected_while_first_is_in_flight() {
    let h = harness_with_guard(GuardConfig {
        per_user_inflight_limit: 1,
        global_inflight_limit: 10,
        slot_ttl_ms: 900_000,
    });

    let first = {
        let executor = h.executor.clone();
        tokio::spawn(async move {
            executor
                .execute_mission(ExecuteMissionInput::new(
                    slow_mission("slow-1"),
                    "alice",
                    RunSource::Manual,
                ))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = h
        .executor
        .execute_mission(ExecuteMissionInput::new(
            slow_mission("slow-1"),
            "alice",
            RunSource::Manual,
        ))
        .await;

    assert!(!second.ok);
    assert!(second.reason.unwrap().contains("per-user cap"));

    let first = first.await.unwrap();
    assert!(first.ok, "reason: {:?}", first.reason);
}

#[tokio::test]
async fn other_users_run_concurrently() {
    let h = harness_with_guard(GuardConfig {
        per_user_inflight_limit: 1,
        global_inflight_limit: 10,
        slot_ttl_ms: 900_000,
    });

    let first = {
        let executor = h.executor.clone();
        tokio::spawn(async move {
            executor
                .execute_mission(ExecuteMissionInput::new(
                    slow_mission("slow-1"),
                    "alice",
                    RunSource::Manual,
                ))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut bob_mission = slow_mission("slow-2");
    bob_mission.user_id = "bob".to_string();
    let second = h
        .executor
        .execute_mission(ExecuteMissionInput::new(bob_mission, "bob", RunSource::Manual))
        .await;
    assert!(second.ok, "reason: {:?}", second.reason);

    assert!(first.await.unwrap().ok);
}
