// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node executors and the type → executor registry.
//!
//! Each executor reads its inputs through the run's `ExecutionContext`
//! (prior outputs, variables, the expression resolver) and returns a
//! `NodeOutput`. User-visible failures come back as `ok = false`; an
//! `Err(NodeExecError)` is reserved for programmer errors and is
//! synthesized into `EXECUTOR_EXCEPTION` by the traversal loop. Node
//! types with no registered executor trace as `NO_EXECUTOR` and the run
//! continues.

pub mod ai;
pub mod logic;
pub mod output;
pub mod transform;
pub mod triggers;

use async_trait::async_trait;
use nova_adapters::{ChannelAdapter, LlmAdapter, SearchAdapter};
use nova_core::context::{ExecutionContext, NodeOutput};
use nova_core::node::MissionNode;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A programmer error escaping a node executor.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct NodeExecError(pub String);

impl NodeExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One node executor. Implementations must not mutate `ctx.mission` and
/// must read inputs only through the context.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError>;
}

/// Map from node type discriminant to executor.
#[derive(Default)]
pub struct ExecutorRegistry {
    map: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
    /// An empty registry; every node type resolves to `NO_EXECUTOR`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in executors wired to the given adapters.
    ///
    /// Data-family leaves (`http-request`, `rss-feed`, `coinbase`,
    /// `file-read`, `form-input`), `loop`, `code`, and `sub-workflow`
    /// are externally provided; register them on top of the defaults.
    pub fn with_defaults<L, S, Ch>(llm: L, search: S, channels: Ch) -> Self
    where
        L: LlmAdapter,
        S: SearchAdapter,
        Ch: ChannelAdapter,
    {
        let mut registry = Self::new();

        registry.register("schedule-trigger", Arc::new(triggers::ScheduleTriggerExecutor));
        for trigger in ["manual-trigger", "webhook-trigger", "event-trigger"] {
            registry.register(trigger, Arc::new(triggers::SimpleTriggerExecutor));
        }

        registry.register("condition", Arc::new(logic::ConditionExecutor));
        registry.register("switch", Arc::new(logic::SwitchExecutor));
        registry.register("merge", Arc::new(logic::MergeExecutor));
        registry.register("split", Arc::new(logic::SplitExecutor));
        registry.register("wait", Arc::new(logic::WaitExecutor));

        registry.register("set-variables", Arc::new(transform::SetVariablesExecutor));
        registry.register("format", Arc::new(transform::FormatExecutor));
        registry.register("filter", Arc::new(transform::FilterExecutor));
        registry.register("sort", Arc::new(transform::SortExecutor));
        registry.register("dedupe", Arc::new(transform::DedupeExecutor));
        registry.register("sticky-note", Arc::new(transform::StickyNoteExecutor));

        for kind in [
            "ai-summarize",
            "ai-classify",
            "ai-extract",
            "ai-generate",
            "ai-chat",
        ] {
            registry.register(kind, Arc::new(ai::AiExecutor::new(llm.clone())));
        }
        registry.register("web-search", Arc::new(ai::WebSearchExecutor::new(search)));

        for kind in [
            "telegram-output",
            "discord-output",
            "email-output",
            "webhook-output",
            "slack-output",
            "novachat-output",
        ] {
            registry.register(kind, Arc::new(output::OutputExecutor::new(channels.clone())));
        }

        registry
    }

    pub fn register(&mut self, type_name: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
        self.map.insert(type_name.into(), executor);
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.map.get(type_name).cloned()
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.map.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
