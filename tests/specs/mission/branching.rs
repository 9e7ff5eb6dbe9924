// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition nodes route one branch and skip the rest.

use crate::prelude::*;
use nova_core::context::{RunSource, TraceStatus};
use nova_core::test_support::MissionBuilder;
use nova_engine::ExecuteMissionInput;
use serde_json::json;

#[tokio::test]
async fn untaken_branch_traces_skipped_with_port_reason() {
    let h = harness();
    let mission = MissionBuilder::new("branching", "alice")
        .integration("novachat")
        .variable("price", json!(70_000))
        .node(json!({"id": "t", "label": "Go", "type": "manual-trigger"}))
        .node(json!({
            "id": "check", "label": "AboveTarget", "type": "condition",
            "rules": [{"left": "{{$vars.price}}", "op": "greaterThan", "right": "65000"}],
        }))
        .node(json!({"id": "alert", "label": "Alert", "type": "format", "template": "price is up"}))
        .node(json!({"id": "quiet", "label": "Quiet", "type": "format", "template": "nothing to say"}))
        .connect("t", "main", "check")
        .connect("check", "true", "alert")
        .connect("check", "false", "quiet")
        .build();

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(mission, "alice", RunSource::Manual))
        .await;

    let status_of = |id: &str| {
        result
            .node_traces
            .iter()
            .filter(|t| t.node_id == id)
            .last()
            .map(|t| (t.status, t.detail.clone()))
            .unwrap()
    };

    assert_eq!(status_of("alert").0, TraceStatus::Completed);
    let (quiet_status, quiet_detail) = status_of("quiet");
    assert_eq!(quiet_status, TraceStatus::Skipped);
    assert_eq!(quiet_detail.as_deref(), Some("Branch not taken: true"));
}

#[tokio::test]
async fn switch_routes_to_named_case_ports() {
    let h = harness();
    let mission = MissionBuilder::new("switching", "alice")
        .integration("novachat")
        .variable("topic", json!("sports"))
        .node(json!({"id": "t", "label": "Go", "type": "manual-trigger"}))
        .node(json!({
            "id": "route", "label": "Route", "type": "switch",
            "expression": "{{$vars.topic}}",
            "cases": [
                {"value": "news", "port": "news"},
                {"value": "sports", "port": "sports"},
            ],
        }))
        .node(json!({"id": "news", "label": "News", "type": "format", "template": "news!"}))
        .node(json!({"id": "sports", "label": "Sports", "type": "format", "template": "sports!"}))
        .connect("t", "main", "route")
        .connect("route", "news", "news")
        .connect("route", "sports", "sports")
        .build();

    let result = h
        .executor
        .execute_mission(ExecuteMissionInput::new(mission, "alice", RunSource::Manual))
        .await;

    let last = |id: &str| {
        result
            .node_traces
            .iter()
            .filter(|t| t.node_id == id)
            .last()
            .unwrap()
    };
    assert_eq!(last("sports").status, TraceStatus::Completed);
    assert_eq!(last("news").status, TraceStatus::Skipped);
    assert_eq!(last("news").detail.as_deref(), Some("Branch not taken: sports"));
}
