// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission record: a user-owned DAG of typed nodes plus settings and
//! execution metadata.

use crate::graph;
use crate::node::{MissionNode, ScheduleTriggerConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Default port for connections that do not name one.
pub const PORT_MAIN: &str = "main";
/// Port taken by failure routing.
pub const PORT_ERROR: &str = "error";

/// Mission lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Draft,
    #[default]
    Active,
    Paused,
    Archived,
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MissionStatus::Draft => "draft",
            MissionStatus::Active => "active",
            MissionStatus::Paused => "paused",
            MissionStatus::Archived => "archived",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Skipped,
}

/// A named default value seeded into the run's variable map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionVariable {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl MissionVariable {
    /// Coerce the default value to the string form used by the resolver.
    pub fn value_string(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionSettings {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub retry_on_fail: bool,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub retry_interval_ms: u64,
    #[serde(default)]
    pub save_execution_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_workflow_id: Option<String>,
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            retry_on_fail: false,
            retry_count: 0,
            retry_interval_ms: 0,
            save_execution_progress: false,
            error_workflow_id: None,
        }
    }
}

fn default_port() -> String {
    PORT_MAIN.to_string()
}

/// A directed edge between two nodes.
///
/// `source_port` routes conditional and error flows; `main` is the
/// default data path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionConnection {
    pub id: String,
    pub source_node_id: String,
    #[serde(default = "default_port")]
    pub source_port: String,
    pub target_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<String>,
}

fn default_version() -> u32 {
    1
}

/// A user-owned automation: nodes, connections, variables, settings, and
/// accumulated execution metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub user_id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: MissionStatus,
    /// Monotonic; incremented on any structural mutation.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Default output channel for this mission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chat_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    /// Local `YYYY-MM-DD` stamp of the last delivery, in the mission's
    /// timezone. Drives the once/daily/weekly gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sent_local_date: Option<String>,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_status: Option<RunStatus>,
    /// UTC instant overriding the trigger's time for the next run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at_override: Option<DateTime<Utc>>,
    #[serde(default)]
    pub nodes: Vec<MissionNode>,
    #[serde(default)]
    pub connections: Vec<MissionConnection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<MissionVariable>,
    #[serde(default)]
    pub settings: MissionSettings,
}

impl Mission {
    pub fn node_by_id(&self, id: &str) -> Option<&MissionNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_by_label(&self, label: &str) -> Option<&MissionNode> {
        self.nodes.iter().find(|n| n.label == label)
    }

    /// Ids of all trigger-family nodes, in declaration order.
    pub fn trigger_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.is_trigger())
            .map(|n| n.id.clone())
            .collect()
    }

    /// The first schedule trigger, if any.
    pub fn schedule_trigger(&self) -> Option<&ScheduleTriggerConfig> {
        self.nodes.iter().find_map(|n| match n.known_kind() {
            Some(crate::node::NodeKind::ScheduleTrigger(config)) => Some(config),
            _ => None,
        })
    }

    /// Effective timezone: the schedule trigger's, else the settings'.
    pub fn timezone(&self) -> &str {
        self.schedule_trigger()
            .and_then(|t| t.timezone.as_deref())
            .unwrap_or(&self.settings.timezone)
    }

    /// Increment the structural version. Called on every save.
    pub fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }

    /// Full save-time validation: structure checks plus acyclicity of
    /// the trigger-reachable subgraph.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.validate_structure();
        if !self.nodes.is_empty() {
            let topo = graph::topo_order(&self.start_ids(), &self.nodes, &self.connections);
            if topo.cycle {
                issues.push(format!(
                    "cycle detected involving: {}",
                    topo.cycle_labels.join(", ")
                ));
            }
        }
        issues
    }

    /// Pure-structure validation, collected rather than short-circuited.
    ///
    /// Checks: non-empty graph, unique node ids, unique labels (labels are
    /// the expression resolver's addressing key), and connections
    /// referencing existing nodes. Cycle detection is separate so run-time
    /// traversal can report it with its own error code.
    pub fn validate_structure(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.nodes.is_empty() {
            issues.push("mission has no nodes".to_string());
            return issues;
        }

        let mut ids = HashSet::new();
        let mut labels = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                issues.push(format!("duplicate node id: {}", node.id));
            }
            if node.label.trim().is_empty() {
                issues.push(format!("node {} has an empty label", node.id));
            } else if !labels.insert(node.label.as_str()) {
                issues.push(format!("duplicate node label: {}", node.label));
            }
        }

        for connection in &self.connections {
            if self.node_by_id(&connection.source_node_id).is_none() {
                issues.push(format!(
                    "connection {} references missing source node {}",
                    connection.id, connection.source_node_id
                ));
            }
            if self.node_by_id(&connection.target_node_id).is_none() {
                issues.push(format!(
                    "connection {} references missing target node {}",
                    connection.id, connection.target_node_id
                ));
            }
        }

        issues
    }

    /// Start set for traversal: trigger nodes, else the first node.
    pub fn start_ids(&self) -> Vec<String> {
        let triggers = self.trigger_ids();
        if triggers.is_empty() {
            self.nodes.first().map(|n| n.id.clone()).into_iter().collect()
        } else {
            triggers
        }
    }
}

/// Reason attached to a mission-delete outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    Deleted,
    NotFound,
    InvalidUser,
}

#[cfg(test)]
#[path = "mission_tests.rs"]
mod tests;
