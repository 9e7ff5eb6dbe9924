// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logic-family executors: condition, switch, merge, split, wait.

use super::{NodeExecError, NodeExecutor};
use async_trait::async_trait;
use nova_core::context::{ExecutionContext, NodeOutput};
use nova_core::node::{CombineMode, ConditionOp, MissionNode, NodeKind};
use serde_json::{json, Value};
use std::time::Duration;

/// Longest a wait node may sleep; the run timeout is the outer bound.
const MAX_WAIT: Duration = Duration::from_millis(300_000);

/// Evaluate one comparison. Ordered operators compare numerically when
/// both sides parse as numbers, else lexically.
pub(crate) fn compare(left: &str, op: ConditionOp, right: &str) -> bool {
    let numeric = || -> Option<(f64, f64)> {
        Some((left.trim().parse().ok()?, right.trim().parse().ok()?))
    };
    match op {
        ConditionOp::Equals => left == right,
        ConditionOp::NotEquals => left != right,
        ConditionOp::Contains => left.contains(right),
        ConditionOp::NotContains => !left.contains(right),
        ConditionOp::GreaterThan => match numeric() {
            Some((l, r)) => l > r,
            None => left > right,
        },
        ConditionOp::LessThan => match numeric() {
            Some((l, r)) => l < r,
            None => left < right,
        },
        ConditionOp::IsEmpty => left.trim().is_empty(),
        ConditionOp::IsNotEmpty => !left.trim().is_empty(),
    }
}

/// Condition node: resolves each rule's sides and routes `true`/`false`.
pub struct ConditionExecutor;

#[async_trait]
impl NodeExecutor for ConditionExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::Condition(config)) = node.known_kind() else {
            return Err(NodeExecError::new("condition executor on non-condition node"));
        };

        let mut results = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            let left = ctx.resolve(&rule.left);
            let right = ctx.resolve(&rule.right);
            results.push(compare(&left, rule.op, &right));
        }
        let passed = match config.combine {
            CombineMode::All => results.iter().all(|r| *r),
            CombineMode::Any => results.iter().any(|r| *r),
        };

        let port = if passed { "true" } else { "false" };
        Ok(NodeOutput::ok_data(port, json!({ "result": passed })).with_port(port))
    }
}

/// Switch node: resolves the expression and routes to the matching
/// case's port (`case_<index>` when unnamed), else the fallback port.
pub struct SwitchExecutor;

#[async_trait]
impl NodeExecutor for SwitchExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::Switch(config)) = node.known_kind() else {
            return Err(NodeExecError::new("switch executor on non-switch node"));
        };

        let value = ctx.resolve(&config.expression);
        let value = value.trim();

        let port = config
            .cases
            .iter()
            .enumerate()
            .find(|(_, case)| case.value == value)
            .map(|(i, case)| {
                case.port
                    .clone()
                    .unwrap_or_else(|| format!("case_{i}"))
            })
            .unwrap_or_else(|| {
                config
                    .fallback_port
                    .clone()
                    .unwrap_or_else(|| "default".to_string())
            });

        Ok(NodeOutput::ok_data(value, json!({ "matched": port })).with_port(port))
    }
}

/// Merge node: concatenates upstream text and item lists.
pub struct MergeExecutor;

#[async_trait]
impl NodeExecutor for MergeExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let text = ctx.upstream_text(&node.id);
        let items = ctx.upstream_items(&node.id);
        let mut output = NodeOutput::ok_text(text);
        if !items.is_empty() {
            output.items = Some(items);
        }
        Ok(output)
    }
}

/// Split node: pulls an array out of upstream output into items.
pub struct SplitExecutor;

#[async_trait]
impl NodeExecutor for SplitExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::Split(config)) = node.known_kind() else {
            return Err(NodeExecError::new("split executor on non-split node"));
        };

        let mut items = Vec::new();
        if let Some(field) = &config.field {
            for upstream in ctx.upstream_outputs(&node.id) {
                if let Some(data) = &upstream.data {
                    if let Some(Value::Array(array)) = walk(data, field) {
                        items.extend(array.iter().cloned());
                    }
                }
            }
        }
        if items.is_empty() {
            items = ctx.upstream_items(&node.id);
        }

        Ok(NodeOutput::ok_items(format!("{} items", items.len()), items))
    }
}

fn walk<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Wait node: bounded cooperative delay.
pub struct WaitExecutor;

#[async_trait]
impl NodeExecutor for WaitExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        _ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::Wait(config)) = node.known_kind() else {
            return Err(NodeExecError::new("wait executor on non-wait node"));
        };
        let delay = Duration::from_millis(config.duration_ms).min(MAX_WAIT);
        tokio::time::sleep(delay).await;
        Ok(NodeOutput::ok_text(format!(
            "waited {}ms",
            delay.as_millis()
        )))
    }
}

#[cfg(test)]
#[path = "logic_tests.rs"]
mod tests;
