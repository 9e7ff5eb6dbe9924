// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-scoped state: node outputs, the execution context, and traces.
//!
//! Nothing in this module is persisted; it lives for the duration of one
//! mission run.

use crate::expr::{self, ResolveEnv};
use crate::mission::{Mission, PORT_MAIN};
use crate::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Key used inside `NodeOutput.data` to mark synthetic skip outputs.
pub const SKIPPED_KEY: &str = "skipped";

/// The result a node executor hands back to the traversal loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
    /// Routing port chosen by condition/switch executors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl NodeOutput {
    pub fn ok_text(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn ok_data(text: impl Into<String>, data: Value) -> Self {
        Self {
            ok: true,
            text: Some(text.into()),
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn ok_items(text: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            ok: true,
            text: Some(text.into()),
            items: Some(items),
            ..Self::default()
        }
    }

    pub fn failed(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            error_code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Synthetic output stored on the `main`-port successors of a failed
    /// node, so their executors observe empty input.
    pub fn upstream_skipped(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: Some(String::new()),
            data: Some(serde_json::json!({ SKIPPED_KEY: true, "reason": reason.into() })),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// The routing port this output resolves to (`main` when unset).
    pub fn resolved_port(&self) -> &str {
        self.port.as_deref().unwrap_or(PORT_MAIN)
    }

    /// True for trigger outputs that report "nothing to do". The run
    /// terminates as skipped when such a node is a trigger.
    pub fn is_trigger_skip(&self) -> bool {
        let Some(data) = &self.data else {
            return false;
        };
        self.ok
            && data.get("triggered").and_then(Value::as_bool) == Some(false)
            && data.get(SKIPPED_KEY).and_then(Value::as_bool) == Some(true)
    }
}

/// What initiated a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunSource {
    Scheduler,
    Trigger,
    Manual,
}

impl fmt::Display for RunSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunSource::Scheduler => "scheduler",
            RunSource::Trigger => "trigger",
            RunSource::Manual => "manual",
        };
        write!(f, "{}", s)
    }
}

/// Per-user scoping handed to adapters so keys and quotas resolve
/// against the right tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserScope {
    pub user_context_id: String,
    pub conversation_id: Option<String>,
}

impl UserScope {
    pub fn new(user_context_id: impl Into<String>) -> Self {
        Self {
            user_context_id: user_context_id.into(),
            conversation_id: None,
        }
    }
}

/// Per-node progress status surfaced to trace sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Running,
    Completed,
    Skipped,
    Failed,
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TraceStatus::Running => "running",
            TraceStatus::Completed => "completed",
            TraceStatus::Skipped => "skipped",
            TraceStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One entry in a run's trace stream, in emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTrace {
    pub node_id: String,
    pub label: String,
    pub status: TraceStatus,
    /// Skip reason or error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// First 200 characters of the node's output text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
    pub at_ms: u64,
}

/// Mutable state owned by a single worker for the duration of one run.
pub struct ExecutionContext {
    pub mission_id: String,
    pub mission_label: String,
    pub run_id: RunId,
    pub run_key: Option<String>,
    pub attempt: u32,
    pub now: DateTime<Utc>,
    pub source: RunSource,
    /// Read-only view of the mission; executors must not mutate it.
    pub mission: Arc<Mission>,
    pub node_outputs: HashMap<String, NodeOutput>,
    pub variables: HashMap<String, String>,
    pub scope: UserScope,
    pub skill_snapshot: Option<Value>,
    ids_by_label: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn new(
        mission: Arc<Mission>,
        run_id: RunId,
        source: RunSource,
        scope: UserScope,
        now: DateTime<Utc>,
    ) -> Self {
        let ids_by_label = mission
            .nodes
            .iter()
            .map(|n| (n.label.clone(), n.id.clone()))
            .collect();
        let variables = mission
            .variables
            .iter()
            .map(|v| (v.name.clone(), v.value_string()))
            .collect();
        Self {
            mission_id: mission.id.clone(),
            mission_label: mission.label.clone(),
            run_id,
            run_key: None,
            attempt: 1,
            now,
            source,
            mission,
            node_outputs: HashMap::new(),
            variables,
            scope,
            skill_snapshot: None,
            ids_by_label,
        }
    }

    /// Resolve `{{ … }}` tokens against this run's outputs and variables.
    pub fn resolve(&self, template: &str) -> String {
        let env = ResolveEnv {
            variables: &self.variables,
            outputs_by_id: &self.node_outputs,
            ids_by_label: &self.ids_by_label,
        };
        expr::resolve(template, &env)
    }

    /// Outputs of this node's upstream sources, in connection order.
    pub fn upstream_outputs(&self, node_id: &str) -> Vec<&NodeOutput> {
        self.mission
            .connections
            .iter()
            .filter(|c| c.target_node_id == node_id)
            .filter_map(|c| self.node_outputs.get(&c.source_node_id))
            .collect()
    }

    /// Concatenated non-empty upstream text, joined by blank lines.
    pub fn upstream_text(&self, node_id: &str) -> String {
        let parts: Vec<&str> = self
            .upstream_outputs(node_id)
            .into_iter()
            .filter_map(|o| o.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect();
        parts.join("\n\n")
    }

    /// Upstream item lists concatenated; falls back to an upstream `data`
    /// array when no explicit items were produced.
    pub fn upstream_items(&self, node_id: &str) -> Vec<Value> {
        let outputs = self.upstream_outputs(node_id);
        let mut items: Vec<Value> = outputs
            .iter()
            .filter_map(|o| o.items.as_ref())
            .flatten()
            .cloned()
            .collect();
        if items.is_empty() {
            for output in outputs {
                if let Some(Value::Array(array)) = &output.data {
                    items.extend(array.iter().cloned());
                }
            }
        }
        items
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
