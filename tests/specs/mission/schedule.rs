// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The schedule gate skips a mission that already ran today.

use crate::prelude::*;
use nova_core::context::RunSource;
use nova_engine::ExecuteMissionInput;

#[tokio::test]
async fn already_sent_today_is_a_successful_skip() {
    let h = harness();
    let mut mission = daily_digest_mission("alice");
    mission.last_sent_local_date = Some("2026-03-13".to_string());

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(
            mission,
            "alice",
            RunSource::Scheduler,
        ))
        .await;

    assert!(result.ok);
    assert!(result.skipped);
    assert_eq!(result.reason.as_deref(), Some("Already ran today"));
    assert!(result.outputs.is_empty());
    assert!(h.channels.calls().is_empty());
}

#[tokio::test]
async fn next_day_runs_again() {
    let h = harness();
    let mut mission = daily_digest_mission("alice");
    mission.last_sent_local_date = Some("2026-03-12".to_string());

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(
            mission,
            "alice",
            RunSource::Scheduler,
        ))
        .await;
    assert!(result.ok);
    assert!(!result.skipped);
    assert_eq!(result.outputs.len(), 1);
}

#[tokio::test]
async fn manual_source_bypasses_the_gate() {
    let h = harness();
    let mut mission = daily_digest_mission("alice");
    mission.last_sent_local_date = Some("2026-03-13".to_string());

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(mission, "alice", RunSource::Manual))
        .await;
    assert!(result.ok);
    assert!(!result.skipped);
}
