// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A cyclic graph fails with both labels and runs nothing.

use crate::prelude::*;
use nova_core::context::RunSource;
use nova_core::test_support::MissionBuilder;
use nova_engine::ExecuteMissionInput;
use serde_json::json;

#[tokio::test]
async fn cycle_aborts_the_run_before_execution() {
    let h = harness();
    let mission = MissionBuilder::new("cyclic", "alice")
        .integration("novachat")
        .node(json!({"id": "t", "label": "Go", "type": "manual-trigger"}))
        .node(json!({"id": "a", "label": "Enrich", "type": "format", "template": "a"}))
        .node(json!({"id": "b", "label": "Refine", "type": "format", "template": "b"}))
        .connect("t", "main", "a")
        .connect("a", "main", "b")
        .connect("b", "main", "a")
        .build();

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(mission, "alice", RunSource::Manual))
        .await;

    assert!(!result.ok);
    let reason = result.reason.unwrap();
    assert!(reason.contains("Enrich"), "reason: {reason}");
    assert!(reason.contains("Refine"), "reason: {reason}");

    // No executors were invoked, nothing was dispatched.
    assert!(result.node_traces.is_empty());
    assert!(h.channels.calls().is_empty());
}
