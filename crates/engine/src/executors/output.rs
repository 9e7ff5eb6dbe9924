// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output-family executors: deliver mission text over a channel.

use super::{NodeExecError, NodeExecutor};
use async_trait::async_trait;
use nova_adapters::{ChannelAdapter, DispatchMeta};
use nova_core::context::{ExecutionContext, NodeOutput};
use nova_core::node::{MissionNode, NodeKind, OutputConfig};
use serde_json::json;

/// Stable output index for idempotent dispatch: the number of output
/// nodes that already produced a result this run. Topological order
/// makes this deterministic across retries.
fn output_index(ctx: &ExecutionContext, node_id: &str) -> usize {
    ctx.mission
        .nodes
        .iter()
        .filter(|n| n.id != node_id && n.is_output() && ctx.node_outputs.contains_key(&n.id))
        .count()
}

/// Executor shared by the six output node types.
pub struct OutputExecutor<Ch: ChannelAdapter> {
    channels: Ch,
}

impl<Ch: ChannelAdapter> OutputExecutor<Ch> {
    pub fn new(channels: Ch) -> Self {
        Self { channels }
    }
}

fn output_config(node: &MissionNode) -> Option<&OutputConfig> {
    match node.known_kind() {
        Some(
            NodeKind::TelegramOutput(c)
            | NodeKind::DiscordOutput(c)
            | NodeKind::EmailOutput(c)
            | NodeKind::WebhookOutput(c)
            | NodeKind::SlackOutput(c)
            | NodeKind::NovachatOutput(c),
        ) => Some(c),
        _ => None,
    }
}

#[async_trait]
impl<Ch: ChannelAdapter> NodeExecutor for OutputExecutor<Ch> {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let (Some(config), Some(channel)) = (output_config(node), node.output_channel())
        else {
            return Err(NodeExecError::new("output executor on non-output node"));
        };

        let text = config
            .template
            .as_deref()
            .map(|t| ctx.resolve(t))
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| ctx.upstream_text(&node.id));
        if text.trim().is_empty() {
            return Ok(NodeOutput::failed("EMPTY_OUTPUT", "no content to deliver"));
        }

        let recipients = if config.recipients.is_empty() {
            ctx.mission.chat_ids.clone()
        } else {
            config.recipients.clone()
        };

        let meta = DispatchMeta {
            mission_run_id: ctx.run_id.to_string(),
            node_id: node.id.clone(),
            output_index: output_index(ctx, &node.id),
        };
        let outcomes = self
            .channels
            .dispatch(channel, &text, &recipients, &ctx.scope, &meta)
            .await;

        let delivered = outcomes.iter().filter(|o| o.ok).count();
        let ok = delivered > 0;
        let error = outcomes.iter().find_map(|o| o.error.clone());

        Ok(NodeOutput {
            ok,
            text: Some(text),
            data: Some(json!({ "channel": channel, "delivered": delivered })),
            error: if ok { None } else { error },
            error_code: if ok { None } else { Some("DISPATCH_FAILED".to_string()) },
            ..NodeOutput::default()
        })
    }
}
