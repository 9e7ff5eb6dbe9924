// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared with other crates' tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use crate::mission::{Mission, MissionConnection, MissionSettings, MissionStatus, MissionVariable};
use crate::node::MissionNode;
use chrono::{TimeZone, Utc};
use serde_json::Value;

/// Fluent builder for missions in tests.
pub struct MissionBuilder {
    mission: Mission,
}

impl MissionBuilder {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap();
        Self {
            mission: Mission {
                id: id.into(),
                user_id: user_id.into(),
                label: "Test Mission".to_string(),
                description: String::new(),
                category: None,
                tags: Vec::new(),
                status: MissionStatus::Active,
                version: 1,
                integration: None,
                chat_ids: Vec::new(),
                created_at: at,
                updated_at: at,
                last_run_at: None,
                last_sent_local_date: None,
                run_count: 0,
                success_count: 0,
                failure_count: 0,
                last_run_status: None,
                scheduled_at_override: None,
                nodes: Vec::new(),
                connections: Vec::new(),
                variables: Vec::new(),
                settings: MissionSettings::default(),
            },
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.mission.label = label.into();
        self
    }

    pub fn status(mut self, status: MissionStatus) -> Self {
        self.mission.status = status;
        self
    }

    pub fn integration(mut self, channel: impl Into<String>) -> Self {
        self.mission.integration = Some(channel.into());
        self
    }

    pub fn chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.mission.chat_ids.push(chat_id.into());
        self
    }

    pub fn timezone(mut self, tz: impl Into<String>) -> Self {
        self.mission.settings.timezone = tz.into();
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.mission.variables.push(MissionVariable {
            name: name.into(),
            value,
        });
        self
    }

    pub fn last_sent_local_date(mut self, stamp: impl Into<String>) -> Self {
        self.mission.last_sent_local_date = Some(stamp.into());
        self
    }

    /// Add a node from its JSON form (the same shape the builder emits).
    pub fn node(mut self, json: Value) -> Self {
        let node: MissionNode = serde_json::from_value(json).expect("valid node json");
        self.mission.nodes.push(node);
        self
    }

    /// Connect `source` → `target` over the given port.
    pub fn connect(mut self, source: &str, port: &str, target: &str) -> Self {
        let id = format!("c{}", self.mission.connections.len() + 1);
        self.mission.connections.push(MissionConnection {
            id,
            source_node_id: source.to_string(),
            source_port: port.to_string(),
            target_node_id: target.to_string(),
            target_port: None,
        });
        self
    }

    pub fn build(self) -> Mission {
        self.mission
    }
}
