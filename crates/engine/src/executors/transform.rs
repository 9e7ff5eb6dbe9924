// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transform-family executors: set-variables, format, filter, sort,
//! dedupe, plus the inert sticky note.

use super::logic::compare;
use super::{NodeExecError, NodeExecutor};
use async_trait::async_trait;
use nova_core::context::{ExecutionContext, NodeOutput};
use nova_core::node::{MissionNode, NodeKind};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Stringify an item field addressed by a dot path; the whole item when
/// no field is given.
fn item_field(item: &Value, field: Option<&str>) -> String {
    let target = match field {
        None | Some("") => Some(item),
        Some(path) => {
            let mut current = item;
            let mut found = Some(());
            for segment in path.split('.') {
                match current.as_object().and_then(|o| o.get(segment)) {
                    Some(next) => current = next,
                    None => {
                        found = None;
                        break;
                    }
                }
            }
            found.map(|_| current)
        }
    };
    match target {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Assigns resolved template values into the run's variable map.
pub struct SetVariablesExecutor;

#[async_trait]
impl NodeExecutor for SetVariablesExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::SetVariables(config)) = node.known_kind() else {
            return Err(NodeExecError::new("set-variables executor on wrong node"));
        };
        let mut resolved: Vec<(String, String)> = config
            .variables
            .iter()
            .map(|(name, template)| (name.clone(), ctx.resolve(template)))
            .collect();
        resolved.sort_by(|a, b| a.0.cmp(&b.0));
        let count = resolved.len();
        for (name, value) in resolved {
            ctx.variables.insert(name, value);
        }
        Ok(NodeOutput::ok_text(format!("set {count} variables")))
    }
}

/// Renders a template against the run state.
pub struct FormatExecutor;

#[async_trait]
impl NodeExecutor for FormatExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::Format(config)) = node.known_kind() else {
            return Err(NodeExecError::new("format executor on non-format node"));
        };
        Ok(NodeOutput::ok_text(ctx.resolve(&config.template)))
    }
}

/// Keeps upstream items whose field passes the configured comparison.
pub struct FilterExecutor;

#[async_trait]
impl NodeExecutor for FilterExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::Filter(config)) = node.known_kind() else {
            return Err(NodeExecError::new("filter executor on non-filter node"));
        };
        let right = ctx.resolve(&config.value);
        let items: Vec<Value> = ctx
            .upstream_items(&node.id)
            .into_iter()
            .filter(|item| compare(&item_field(item, config.field.as_deref()), config.op, &right))
            .collect();
        Ok(NodeOutput::ok_items(
            format!("{} items kept", items.len()),
            items,
        ))
    }
}

/// Orders upstream items by a field, numerically when possible.
pub struct SortExecutor;

#[async_trait]
impl NodeExecutor for SortExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::Sort(config)) = node.known_kind() else {
            return Err(NodeExecError::new("sort executor on non-sort node"));
        };
        let mut items = ctx.upstream_items(&node.id);
        let field = config.field.as_deref();
        items.sort_by(|a, b| {
            let left = item_field(a, field);
            let right = item_field(b, field);
            let ordering = match (left.parse::<f64>(), right.parse::<f64>()) {
                (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
                _ => left.cmp(&right),
            };
            if config.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        Ok(NodeOutput::ok_items(
            format!("{} items sorted", items.len()),
            items,
        ))
    }
}

/// Drops later items whose key repeats an earlier one.
pub struct DedupeExecutor;

#[async_trait]
impl NodeExecutor for DedupeExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::Dedupe(config)) = node.known_kind() else {
            return Err(NodeExecError::new("dedupe executor on non-dedupe node"));
        };
        let mut seen = HashSet::new();
        let items: Vec<Value> = ctx
            .upstream_items(&node.id)
            .into_iter()
            .filter(|item| seen.insert(item_field(item, config.field.as_deref())))
            .collect();
        Ok(NodeOutput::ok_items(
            format!("{} unique items", items.len()),
            items,
        ))
    }
}

/// Sticky notes are annotations; executing one is a no-op.
pub struct StickyNoteExecutor;

#[async_trait]
impl NodeExecutor for StickyNoteExecutor {
    async fn execute(
        &self,
        _node: &MissionNode,
        _ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        Ok(NodeOutput::ok_text(""))
    }
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
