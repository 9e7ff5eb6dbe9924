// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger-family executors.

use super::{NodeExecError, NodeExecutor};
use crate::gate::should_mission_run_now;
use async_trait::async_trait;
use nova_core::context::{ExecutionContext, NodeOutput, RunSource};
use nova_core::node::MissionNode;
use serde_json::json;

/// Schedule trigger: re-checks the gate for scheduler-driven runs so a
/// run admitted on a stale decision still terminates as skipped. Manual
/// and webhook runs fire unconditionally.
pub struct ScheduleTriggerExecutor;

#[async_trait]
impl NodeExecutor for ScheduleTriggerExecutor {
    async fn execute(
        &self,
        _node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        if ctx.source == RunSource::Scheduler {
            let decision = should_mission_run_now(&ctx.mission, ctx.now);
            if !decision.due {
                return Ok(NodeOutput {
                    ok: true,
                    text: Some(decision.reason),
                    data: Some(json!({ "triggered": false, "skipped": true })),
                    ..NodeOutput::default()
                });
            }
        }
        Ok(NodeOutput::ok_data(
            "Schedule trigger fired",
            json!({ "triggered": true }),
        ))
    }
}

/// Manual, webhook, and event triggers fire whenever the run reaches
/// them; payload interpretation belongs to the caller that started the
/// run (seeded via mission variables).
pub struct SimpleTriggerExecutor;

#[async_trait]
impl NodeExecutor for SimpleTriggerExecutor {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        Ok(NodeOutput::ok_data(
            format!("{} fired ({})", node.type_name(), ctx.source),
            json!({ "triggered": true }),
        ))
    }
}
