// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A failing node skips its main successors; the fallback output
//! still notifies the user.

use crate::prelude::*;
use nova_core::context::{RunSource, TraceStatus};
use nova_engine::ExecuteMissionInput;

#[tokio::test]
async fn ai_failure_routes_to_fallback_output() {
    let h = harness();
    h.llm.enqueue_error("provider melted");

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(
            daily_digest_mission("alice"),
            "alice",
            RunSource::Scheduler,
        ))
        .await;

    let last = |id: &str| {
        result
            .node_traces
            .iter()
            .filter(|t| t.node_id == id)
            .last()
            .unwrap()
    };
    assert_eq!(last("ai").status, TraceStatus::Failed);
    assert_eq!(last("out").status, TraceStatus::Skipped);
    assert!(last("out")
        .detail
        .as_deref()
        .unwrap()
        .starts_with("Upstream node Summarize failed"));

    // Fallback carried the last non-empty upstream text.
    assert!(result.ok);
    assert!(result.outputs.last().unwrap().node_id.starts_with("fallback:"));
    assert_eq!(h.channels.texts_for("novachat"), vec!["A"]);
}

#[tokio::test]
async fn overall_ok_equals_fallback_ok_when_everything_fails() {
    let h = harness();
    h.llm.enqueue_error("provider melted");
    h.channels.fail_channel("novachat");

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(
            daily_digest_mission("alice"),
            "alice",
            RunSource::Scheduler,
        ))
        .await;

    assert!(!result.ok);
    assert!(result.outputs.iter().all(|o| !o.ok));
}

#[tokio::test]
async fn canned_fallback_text_when_no_node_produced_any() {
    let h = harness();
    h.llm.enqueue_error("provider melted");

    // Mission whose only node before the output is the failing AI node:
    // there is no non-empty upstream text to reuse.
    let mission = {
        use nova_core::test_support::MissionBuilder;
        use serde_json::json;
        MissionBuilder::new("bare", "alice")
            .integration("novachat")
            .node(json!({"id": "ai", "label": "Summarize", "type": "ai-summarize", "prompt": "p"}))
            .node(json!({"id": "out", "label": "Deliver", "type": "novachat-output"}))
            .connect("ai", "main", "out")
            .build()
    };

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(mission, "alice", RunSource::Manual))
        .await;

    assert!(result.ok);
    assert_eq!(
        h.channels.texts_for("novachat"),
        vec!["Mission completed with upstream errors."]
    );
}
