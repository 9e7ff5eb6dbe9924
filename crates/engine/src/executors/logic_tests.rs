// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use nova_core::context::{RunSource, UserScope};
use nova_core::test_support::MissionBuilder;
use nova_core::RunId;
use serde_json::json;
use std::sync::Arc;
use yare::parameterized;

fn ctx_for(mission: nova_core::mission::Mission) -> ExecutionContext {
    ExecutionContext::new(
        Arc::new(mission),
        RunId::new("run-1"),
        RunSource::Manual,
        UserScope::new("alice"),
        Utc::now(),
    )
}

#[parameterized(
    equals_true = { "a", ConditionOp::Equals, "a", true },
    equals_false = { "a", ConditionOp::Equals, "b", false },
    not_equals = { "a", ConditionOp::NotEquals, "b", true },
    contains = { "hello world", ConditionOp::Contains, "world", true },
    not_contains = { "hello", ConditionOp::NotContains, "world", true },
    greater_numeric = { "10", ConditionOp::GreaterThan, "9", true },
    greater_numeric_false = { "9", ConditionOp::GreaterThan, "10", false },
    less_numeric = { "3.5", ConditionOp::LessThan, "4", true },
    greater_lexical = { "b", ConditionOp::GreaterThan, "a", true },
    is_empty = { "  ", ConditionOp::IsEmpty, "", true },
    is_not_empty = { "x", ConditionOp::IsNotEmpty, "", true },
)]
fn compare_cases(left: &str, op: ConditionOp, right: &str, expected: bool) {
    assert_eq!(compare(left, op, right), expected);
}

#[tokio::test]
async fn condition_routes_true_port() {
    let mission = MissionBuilder::new("m1", "alice")
        .variable("count", json!(5))
        .node(json!({
            "id": "c", "label": "Check", "type": "condition",
            "rules": [{"left": "{{$vars.count}}", "op": "greaterThan", "right": "3"}],
        }))
        .build();
    let mut ctx = ctx_for(mission.clone());
    let node = mission.node_by_id("c").unwrap();

    let output = ConditionExecutor.execute(node, &mut ctx).await.unwrap();
    assert!(output.ok);
    assert_eq!(output.port.as_deref(), Some("true"));
    assert_eq!(output.data.unwrap()["result"], true);
}

#[tokio::test]
async fn condition_all_requires_every_rule() {
    let mission = MissionBuilder::new("m1", "alice")
        .variable("count", json!(5))
        .node(json!({
            "id": "c", "label": "Check", "type": "condition",
            "combine": "all",
            "rules": [
                {"left": "{{$vars.count}}", "op": "greaterThan", "right": "3"},
                {"left": "{{$vars.count}}", "op": "lessThan", "right": "4"},
            ],
        }))
        .build();
    let mut ctx = ctx_for(mission.clone());
    let node = mission.node_by_id("c").unwrap();

    let output = ConditionExecutor.execute(node, &mut ctx).await.unwrap();
    assert_eq!(output.port.as_deref(), Some("false"));
}

#[tokio::test]
async fn condition_any_needs_one_rule() {
    let mission = MissionBuilder::new("m1", "alice")
        .variable("count", json!(5))
        .node(json!({
            "id": "c", "label": "Check", "type": "condition",
            "combine": "any",
            "rules": [
                {"left": "{{$vars.count}}", "op": "greaterThan", "right": "100"},
                {"left": "{{$vars.count}}", "op": "greaterThan", "right": "1"},
            ],
        }))
        .build();
    let mut ctx = ctx_for(mission.clone());
    let node = mission.node_by_id("c").unwrap();

    let output = ConditionExecutor.execute(node, &mut ctx).await.unwrap();
    assert_eq!(output.port.as_deref(), Some("true"));
}

#[tokio::test]
async fn switch_routes_matching_case() {
    let mission = MissionBuilder::new("m1", "alice")
        .variable("kind", json!("news"))
        .node(json!({
            "id": "s", "label": "Route", "type": "switch",
            "expression": "{{$vars.kind}}",
            "cases": [
                {"value": "sports", "port": "case_sports"},
                {"value": "news"},
            ],
        }))
        .build();
    let mut ctx = ctx_for(mission.clone());
    let node = mission.node_by_id("s").unwrap();

    let output = SwitchExecutor.execute(node, &mut ctx).await.unwrap();
    assert_eq!(output.port.as_deref(), Some("case_1"));
}

#[tokio::test]
async fn switch_falls_back_to_default_port() {
    let mission = MissionBuilder::new("m1", "alice")
        .variable("kind", json!("other"))
        .node(json!({
            "id": "s", "label": "Route", "type": "switch",
            "expression": "{{$vars.kind}}",
            "cases": [{"value": "sports", "port": "case_sports"}],
        }))
        .build();
    let mut ctx = ctx_for(mission.clone());
    let node = mission.node_by_id("s").unwrap();

    let output = SwitchExecutor.execute(node, &mut ctx).await.unwrap();
    assert_eq!(output.port.as_deref(), Some("default"));
}

#[tokio::test]
async fn merge_concatenates_upstream() {
    let mission = MissionBuilder::new("m1", "alice")
        .node(json!({"id": "a", "label": "A", "type": "format", "template": ""}))
        .node(json!({"id": "b", "label": "B", "type": "format", "template": ""}))
        .node(json!({"id": "m", "label": "Merge", "type": "merge"}))
        .connect("a", "main", "m")
        .connect("b", "main", "m")
        .build();
    let mut ctx = ctx_for(mission.clone());
    ctx.node_outputs
        .insert("a".to_string(), NodeOutput::ok_text("one"));
    ctx.node_outputs
        .insert("b".to_string(), NodeOutput::ok_text("two"));

    let node = mission.node_by_id("m").unwrap();
    let output = MergeExecutor.execute(node, &mut ctx).await.unwrap();
    assert_eq!(output.text.as_deref(), Some("one\n\ntwo"));
}

#[tokio::test]
async fn split_extracts_nested_array() {
    let mission = MissionBuilder::new("m1", "alice")
        .node(json!({"id": "a", "label": "A", "type": "format", "template": ""}))
        .node(json!({"id": "s", "label": "Split", "type": "split", "field": "feed.entries"}))
        .connect("a", "main", "s")
        .build();
    let mut ctx = ctx_for(mission.clone());
    ctx.node_outputs.insert(
        "a".to_string(),
        NodeOutput::ok_data("t", json!({"feed": {"entries": [1, 2, 3]}})),
    );

    let node = mission.node_by_id("s").unwrap();
    let output = SplitExecutor.execute(node, &mut ctx).await.unwrap();
    assert_eq!(output.items.unwrap().len(), 3);
}

#[tokio::test]
async fn wait_sleeps_the_configured_duration() {
    let mission = MissionBuilder::new("m1", "alice")
        .node(json!({"id": "w", "label": "Wait", "type": "wait", "durationMs": 10}))
        .build();
    let mut ctx = ctx_for(mission.clone());
    let node = mission.node_by_id("w").unwrap();

    let start = std::time::Instant::now();
    let output = WaitExecutor.execute(node, &mut ctx).await.unwrap();
    assert!(output.ok);
    assert!(start.elapsed() >= Duration::from_millis(10));
}
