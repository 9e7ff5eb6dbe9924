// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scheduled pipeline runs end to end at its trigger time.

use crate::prelude::*;
use nova_core::context::{RunSource, TraceStatus};
use nova_engine::ExecuteMissionInput;

#[tokio::test]
async fn scheduled_daily_pipeline_delivers_once() {
    let h = harness();
    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(
            daily_digest_mission("alice"),
            "alice",
            RunSource::Scheduler,
        ))
        .await;

    assert!(result.ok, "reason: {:?}", result.reason);
    assert!(!result.skipped);
    assert_eq!(result.outputs.len(), 1);
    assert!(result.outputs[0].ok);

    // Trace order is the topological order, every node completed.
    let completed: Vec<&str> = result
        .node_traces
        .iter()
        .filter(|t| t.status == TraceStatus::Completed)
        .map(|t| t.node_id.as_str())
        .collect();
    assert_eq!(completed, vec!["trigger", "fetch", "ai", "out"]);

    // The fetched text flowed through the echo LLM to the channel.
    assert_eq!(h.channels.texts_for("novachat"), vec!["A"]);
}

#[tokio::test]
async fn node_trace_sequence_is_a_topological_order() {
    let h = harness();
    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(
            daily_digest_mission("alice"),
            "alice",
            RunSource::Scheduler,
        ))
        .await;

    // First-seen order of node ids in the trace stream.
    let mut seen = Vec::new();
    for trace in &result.node_traces {
        if !seen.contains(&trace.node_id.as_str()) {
            seen.push(trace.node_id.as_str());
        }
    }
    assert_eq!(seen, vec!["trigger", "fetch", "ai", "out"]);
}

#[tokio::test]
async fn run_outcome_can_be_recorded_on_the_store() {
    use nova_core::mission::RunStatus;
    use nova_core::Clock;
    use nova_storage::{MissionStore, RunOutcome, StorePaths};

    let dir = tempfile::tempdir().unwrap();
    let h = harness();
    let store = MissionStore::new(
        StorePaths::new(dir.path()),
        h.clock.clone(),
        nova_core::SequentialIdGen::new("m"),
    );

    let mission = daily_digest_mission("alice");
    store.upsert_mission(mission.clone(), "alice").await.unwrap();

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(mission, "alice", RunSource::Scheduler))
        .await;
    assert!(result.ok);

    store
        .record_run_outcome(
            "digest-1",
            "alice",
            RunOutcome {
                status: RunStatus::Success,
                ran_at: h.clock.utc_now(),
                day_stamp: result.day_stamp.clone(),
                clear_override: false,
            },
        )
        .await
        .unwrap();

    let loaded = store.load_missions("alice").await.unwrap();
    assert_eq!(loaded[0].run_count, 1);
    assert_eq!(loaded[0].success_count, 1);
    assert_eq!(loaded[0].last_sent_local_date.as_deref(), Some("2026-03-13"));
}
