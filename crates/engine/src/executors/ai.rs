// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI-family and web-search executors, backed by adapters.

use super::{NodeExecError, NodeExecutor};
use async_trait::async_trait;
use nova_adapters::{LlmAdapter, SearchAdapter};
use nova_core::context::{ExecutionContext, NodeOutput};
use nova_core::node::{AiNodeConfig, MissionNode, NodeKind};
use serde_json::json;

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Executor for the five `ai-*` node types. The node type picks the
/// system prompt; the user text is the resolved prompt plus upstream
/// output.
pub struct AiExecutor<L: LlmAdapter> {
    llm: L,
}

impl<L: LlmAdapter> AiExecutor<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    fn system_prompt(type_name: &str, config: &AiNodeConfig) -> String {
        match type_name {
            "ai-summarize" => "Summarize the following content concisely.".to_string(),
            "ai-classify" => format!(
                "Classify the input into exactly one of these categories: {}. \
                 Reply with the category name only.",
                config.categories.join(", ")
            ),
            "ai-extract" => format!(
                "Extract these fields from the input and reply with a JSON object: {}.",
                config.fields.join(", ")
            ),
            "ai-generate" => "Produce the requested content.".to_string(),
            _ => "You are Nova, a helpful personal assistant.".to_string(),
        }
    }
}

#[async_trait]
impl<L: LlmAdapter> NodeExecutor for AiExecutor<L> {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let config = match node.known_kind() {
            Some(
                NodeKind::AiSummarize(c)
                | NodeKind::AiClassify(c)
                | NodeKind::AiExtract(c)
                | NodeKind::AiGenerate(c)
                | NodeKind::AiChat(c),
            ) => c,
            _ => return Err(NodeExecError::new("ai executor on non-ai node")),
        };

        let prompt = config
            .prompt
            .as_deref()
            .map(|p| ctx.resolve(p))
            .unwrap_or_default();
        let upstream = ctx.upstream_text(&node.id);
        let user_text = match (prompt.is_empty(), upstream.is_empty()) {
            (false, false) => format!("{prompt}\n\n{upstream}"),
            (false, true) => prompt,
            (true, false) => upstream,
            (true, true) => {
                return Ok(NodeOutput::failed(
                    "EMPTY_INPUT",
                    "no prompt and no upstream input",
                ))
            }
        };

        let system = Self::system_prompt(node.type_name(), config);
        let max_tokens = config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        match self
            .llm
            .complete(&system, &user_text, max_tokens, &ctx.scope)
            .await
        {
            Ok(completion) => Ok(NodeOutput::ok_data(
                completion.text.clone(),
                json!({ "provider": completion.provider, "model": completion.model }),
            )),
            Err(e) => Ok(NodeOutput::failed("LLM_FAILED", e.to_string())),
        }
    }
}

/// Web search executor. Empty result lists are data, not errors.
pub struct WebSearchExecutor<S: SearchAdapter> {
    search: S,
}

impl<S: SearchAdapter> WebSearchExecutor<S> {
    pub fn new(search: S) -> Self {
        Self { search }
    }
}

#[async_trait]
impl<S: SearchAdapter> NodeExecutor for WebSearchExecutor<S> {
    async fn execute(
        &self,
        node: &MissionNode,
        ctx: &mut ExecutionContext,
    ) -> Result<NodeOutput, NodeExecError> {
        let Some(NodeKind::WebSearch(config)) = node.known_kind() else {
            return Err(NodeExecError::new("web-search executor on wrong node"));
        };

        let query = ctx.resolve(&config.query);
        let query = query.trim();
        if query.is_empty() {
            return Ok(NodeOutput::failed("EMPTY_QUERY", "search query is empty"));
        }

        match self.search.search(query, &ctx.scope).await {
            Ok(response) => {
                let limit = config.max_results.unwrap_or(10) as usize;
                let results: Vec<_> = response.results.into_iter().take(limit).collect();
                let text = if results.is_empty() {
                    "No results found.".to_string()
                } else {
                    results
                        .iter()
                        .map(|r| format!("{} ({})", r.title, r.url))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                let items = results
                    .iter()
                    .map(|r| json!({ "title": r.title, "url": r.url, "snippet": r.snippet }))
                    .collect();
                let mut output = NodeOutput::ok_items(text, items);
                output.data = Some(json!({
                    "provider": response.provider,
                    "searchUrl": response.search_url,
                }));
                Ok(output)
            }
            Err(e) => Ok(NodeOutput::failed("SEARCH_FAILED", e.to_string())),
        }
    }
}
