// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission executor: topological traversal with branch and failure
//! routing, trigger skips, fallback output, and a hard wall-clock
//! timeout.
//!
//! Within one run, node execution is single-threaded cooperative: each
//! executor (and each trace-sink call) is awaited before the next node
//! starts, in topological order. Parallelism across runs is bounded by
//! the scheduler and the execution guard.

use crate::config::EngineConfig;
use crate::executors::ExecutorRegistry;
use crate::gate::{local_day_stamp, should_mission_run_now};
use crate::guard::ExecutionGuard;
use futures::future::BoxFuture;
use nova_adapters::{ChannelAdapter, DispatchMeta};
use nova_core::context::{ExecutionContext, NodeOutput, NodeTrace, RunSource, TraceStatus, UserScope};
use nova_core::mission::{Mission, PORT_MAIN};
use nova_core::node::NodeKind;
use nova_core::{Clock, IdGen, RunId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Awaited once per emitted trace, in emission order.
pub type TraceSink = Arc<dyn Fn(NodeTrace) -> BoxFuture<'static, ()> + Send + Sync>;

/// Node id used in dispatch metadata for the fallback output path.
const FALLBACK_NODE_ID: &str = "fallback";
/// Delivered when every node text is empty but the user must still hear
/// back.
const FALLBACK_TEXT: &str = "Mission completed with upstream errors.";
/// Default personal channel, tried when the mission's primary channel
/// fails or is unset.
const DEFAULT_CHANNEL: &str = "novachat";

/// Everything needed to run one mission once.
pub struct ExecuteMissionInput {
    pub mission: Mission,
    pub user_context_id: String,
    pub source: RunSource,
    /// Minted when absent.
    pub run_id: Option<String>,
    pub run_key: Option<String>,
    pub attempt: u32,
    /// Extra variables seeded over the mission's defaults (e.g. webhook
    /// payload fields).
    pub extra_variables: HashMap<String, String>,
    pub trace_sink: Option<TraceSink>,
}

impl ExecuteMissionInput {
    pub fn new(mission: Mission, user_context_id: impl Into<String>, source: RunSource) -> Self {
        Self {
            mission,
            user_context_id: user_context_id.into(),
            source,
            run_id: None,
            run_key: None,
            attempt: 1,
            extra_variables: HashMap::new(),
            trace_sink: None,
        }
    }
}

/// Result of one output node (or fallback attempt), in dispatch order.
#[derive(Debug, Clone)]
pub struct OutputResult {
    pub node_id: String,
    pub ok: bool,
    pub error: Option<String>,
}

/// What one run resolved to. Always produced; the executor never throws.
#[derive(Debug, Clone)]
pub struct ExecuteMissionResult {
    pub ok: bool,
    pub skipped: bool,
    pub reason: Option<String>,
    /// Stable machine-readable code for structural and admission
    /// failures (`CYCLE_DETECTED`, `EMPTY_MISSION`,
    /// `GRAPH_VALIDATION_FAILED`, `concurrency_blocked`).
    pub error_code: Option<&'static str>,
    pub outputs: Vec<OutputResult>,
    pub node_traces: Vec<NodeTrace>,
    pub duration_ms: u64,
    /// Local day stamp of the run, for `lastSentLocalDate` bookkeeping.
    pub day_stamp: Option<String>,
}

impl ExecuteMissionResult {
    fn failure(
        reason: impl Into<String>,
        error_code: Option<&'static str>,
        traces: Vec<NodeTrace>,
        duration_ms: u64,
    ) -> Self {
        Self {
            ok: false,
            skipped: false,
            reason: Some(reason.into()),
            error_code,
            outputs: Vec::new(),
            node_traces: traces,
            duration_ms,
            day_stamp: None,
        }
    }
}

/// Orchestrates mission runs against the executor registry and the
/// channel dispatcher.
#[derive(Clone)]
pub struct MissionExecutor<Ch, C, G>
where
    Ch: ChannelAdapter,
    C: Clock,
    G: IdGen,
{
    registry: Arc<ExecutorRegistry>,
    channels: Ch,
    guard: ExecutionGuard,
    clock: C,
    id_gen: G,
    config: EngineConfig,
}

impl<Ch, C, G> MissionExecutor<Ch, C, G>
where
    Ch: ChannelAdapter,
    C: Clock + 'static,
    G: IdGen + 'static,
{
    pub fn new(
        registry: Arc<ExecutorRegistry>,
        channels: Ch,
        guard: ExecutionGuard,
        clock: C,
        id_gen: G,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            channels,
            guard,
            clock,
            id_gen,
            config,
        }
    }

    /// Run a mission under the configured wall-clock timeout.
    ///
    /// On timeout the caller gets a failure result immediately; the
    /// in-flight run detaches and its eventual completion is ignored.
    pub async fn execute_mission(&self, input: ExecuteMissionInput) -> ExecuteMissionResult {
        let timeout = self.config.max_run_duration;
        let mission_id = input.mission.id.clone();
        let this = self.clone();
        let handle = tokio::spawn(async move { this.execute_core(input).await });

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                error!(mission = %mission_id, error = %join_error, "mission run task failed");
                ExecuteMissionResult::failure(
                    format!("Mission run task failed: {join_error}"),
                    None,
                    Vec::new(),
                    timeout.as_millis() as u64,
                )
            }
            Err(_) => {
                let reason = format!(
                    "Mission execution timed out after {}s.",
                    timeout.as_secs()
                );
                error!(mission = %mission_id, "mission.run.failed: {reason}");
                ExecuteMissionResult::failure(reason, None, Vec::new(), timeout.as_millis() as u64)
            }
        }
    }

    async fn execute_core(self, input: ExecuteMissionInput) -> ExecuteMissionResult {
        let started = self.clock.now();
        let now = self.clock.utc_now();
        let mission = Arc::new(input.mission);
        let run_id = input.run_id.clone().unwrap_or_else(|| self.id_gen.next());
        let elapsed_ms = |clock: &C| clock.now().duration_since(started).as_millis() as u64;

        // 1. Execution slot. A rejection is the whole result.
        let _slot = match self
            .guard
            .acquire(&input.user_context_id, &run_id, self.clock.epoch_ms())
        {
            Ok(slot) => slot,
            Err(e) => {
                warn!(
                    mission = %mission.id,
                    run = %run_id,
                    reason = %e.reason,
                    "mission.run.failed: concurrency blocked"
                );
                return ExecuteMissionResult::failure(
                    e.reason,
                    Some("concurrency_blocked"),
                    Vec::new(),
                    0,
                );
            }
        };

        info!(
            mission = %mission.id,
            run = %run_id,
            source = %input.source,
            attempt = input.attempt,
            "mission.run.started"
        );

        let day_stamp = local_day_stamp(&mission, now);

        // 2. Schedule gate for scheduler-driven runs.
        if input.source == RunSource::Scheduler {
            let decision = should_mission_run_now(&mission, now);
            if !decision.due {
                info!(
                    mission = %mission.id,
                    run = %run_id,
                    reason = %decision.reason,
                    skipped = true,
                    "mission.run.completed"
                );
                return ExecuteMissionResult {
                    ok: true,
                    skipped: true,
                    reason: Some(decision.reason),
                    error_code: None,
                    outputs: Vec::new(),
                    node_traces: Vec::new(),
                    duration_ms: elapsed_ms(&self.clock),
                    day_stamp: Some(decision.day_stamp),
                };
            }
        }

        // 3. Structure validation.
        if mission.nodes.is_empty() {
            return self.fail_run(&mission, &run_id, "Mission has no nodes.", "EMPTY_MISSION", started);
        }
        let issues = mission.validate_structure();
        if !issues.is_empty() {
            return self.fail_run(
                &mission,
                &run_id,
                format!("Mission graph validation failed: {}", issues.join("; ")),
                "GRAPH_VALIDATION_FAILED",
                started,
            );
        }

        // 4. Topological order; cycles abort before any executor runs.
        let start_ids = mission.start_ids();
        let topo = nova_core::graph::topo_order(&start_ids, &mission.nodes, &mission.connections);
        if topo.cycle {
            return self.fail_run(
                &mission,
                &run_id,
                format!(
                    "Cycle detected involving: {}",
                    topo.cycle_labels.join(", ")
                ),
                "CYCLE_DETECTED",
                started,
            );
        }

        // 5. Run context.
        let scope = UserScope::new(input.user_context_id.clone());
        let mut ctx = ExecutionContext::new(
            Arc::clone(&mission),
            RunId::new(run_id.clone()),
            input.source,
            scope.clone(),
            now,
        );
        ctx.run_key = input.run_key.clone();
        ctx.attempt = input.attempt.max(1);
        ctx.variables.extend(input.extra_variables.clone());

        let nodes_by_id: HashMap<&str, &nova_core::node::MissionNode> = mission
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();

        let mut traces: Vec<NodeTrace> = Vec::new();
        let mut outputs: Vec<OutputResult> = Vec::new();
        let mut skip_reasons: HashMap<String, String> = HashMap::new();

        // 6. Ordered node loop.
        for node_id in &topo.order {
            let Some(node) = nodes_by_id.get(node_id.as_str()).copied() else {
                continue;
            };

            if node.disabled {
                self.emit(
                    &mut traces,
                    &input.trace_sink,
                    self.trace(node, TraceStatus::Skipped, Some("node disabled".to_string())),
                )
                .await;
                continue;
            }

            if let Some(reason) = skip_reasons.get(node_id) {
                self.emit(
                    &mut traces,
                    &input.trace_sink,
                    self.trace(node, TraceStatus::Skipped, Some(reason.clone())),
                )
                .await;
                continue;
            }

            self.emit(
                &mut traces,
                &input.trace_sink,
                self.trace(node, TraceStatus::Running, None),
            )
            .await;

            let Some(executor) = self.registry.get(node.type_name()) else {
                let output = NodeOutput::failed(
                    "NO_EXECUTOR",
                    format!("no executor for node type {}", node.type_name()),
                );
                let detail = output.error.clone();
                ctx.node_outputs.insert(node_id.clone(), output);
                self.emit(
                    &mut traces,
                    &input.trace_sink,
                    self.trace(node, TraceStatus::Failed, detail),
                )
                .await;
                continue;
            };

            let output = match executor.execute(node, &mut ctx).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(
                        mission = %mission.id,
                        run = %run_id,
                        node = %node.label,
                        error = %e,
                        "executor exception"
                    );
                    NodeOutput::failed("EXECUTOR_EXCEPTION", e.to_string())
                }
            };
            ctx.node_outputs.insert(node_id.clone(), output.clone());

            // A trigger that reports "nothing to do" ends the run as
            // skipped.
            if node.is_trigger() && output.is_trigger_skip() {
                let reason = output.text.clone().unwrap_or_default();
                self.emit(
                    &mut traces,
                    &input.trace_sink,
                    self.trace(node, TraceStatus::Skipped, Some(reason.clone())),
                )
                .await;
                info!(
                    mission = %mission.id,
                    run = %run_id,
                    reason = %reason,
                    skipped = true,
                    "mission.run.completed"
                );
                return ExecuteMissionResult {
                    ok: true,
                    skipped: true,
                    reason: Some(reason),
                    error_code: None,
                    outputs,
                    node_traces: traces,
                    duration_ms: elapsed_ms(&self.clock),
                    day_stamp: Some(day_stamp),
                };
            }

            if !output.ok {
                // Failure routing: main-port successors observe empty
                // input; error-port successors run against the raw
                // failed output.
                let upstream_reason = format!(
                    "Upstream node {} failed: {}",
                    node.label,
                    output.error.as_deref().unwrap_or("unknown error")
                );
                for connection in &mission.connections {
                    if connection.source_node_id != *node_id
                        || connection.source_port != PORT_MAIN
                    {
                        continue;
                    }
                    skip_reasons
                        .entry(connection.target_node_id.clone())
                        .or_insert_with(|| upstream_reason.clone());
                    ctx.node_outputs
                        .entry(connection.target_node_id.clone())
                        .or_insert_with(|| NodeOutput::upstream_skipped(upstream_reason.clone()));
                }

                if node.is_output() {
                    outputs.push(OutputResult {
                        node_id: node_id.clone(),
                        ok: false,
                        error: output.error.clone(),
                    });
                }

                warn!(
                    mission = %mission.id,
                    run = %run_id,
                    node = %node.label,
                    code = output.error_code.as_deref().unwrap_or("UNKNOWN"),
                    error = output.error.as_deref().unwrap_or(""),
                    "node failed"
                );
                self.emit(
                    &mut traces,
                    &input.trace_sink,
                    self.trace(node, TraceStatus::Failed, output.error.clone()),
                )
                .await;
                continue;
            }

            // Branch routing: edges off the resolved port are not taken.
            if matches!(
                node.known_kind(),
                Some(NodeKind::Condition(_) | NodeKind::Switch(_))
            ) {
                let resolved = output.resolved_port().to_string();
                for connection in &mission.connections {
                    if connection.source_node_id == *node_id && connection.source_port != resolved
                    {
                        skip_reasons
                            .entry(connection.target_node_id.clone())
                            .or_insert_with(|| format!("Branch not taken: {resolved}"));
                    }
                }
            }

            if node.is_output() {
                outputs.push(OutputResult {
                    node_id: node_id.clone(),
                    ok: true,
                    error: None,
                });
            }

            let mut trace = self.trace(node, TraceStatus::Completed, None);
            trace.text_preview = output
                .text
                .as_deref()
                .map(|t| t.chars().take(200).collect());
            trace.artifact_ref = output.artifact_ref.clone();
            self.emit(&mut traces, &input.trace_sink, trace).await;
        }

        // 7. Fallback output: the user hears back even when every output
        // node failed or was skipped.
        if !outputs.iter().any(|o| o.ok) {
            let fallback_text = topo
                .order
                .iter()
                .rev()
                .filter_map(|id| ctx.node_outputs.get(id))
                .filter_map(|o| o.text.as_deref())
                .find(|t| !t.trim().is_empty())
                .unwrap_or(FALLBACK_TEXT)
                .to_string();

            let mut channels_to_try: Vec<&str> = Vec::new();
            if let Some(primary) = mission.integration.as_deref() {
                channels_to_try.push(primary);
            }
            if mission.integration.as_deref() != Some(DEFAULT_CHANNEL) {
                channels_to_try.push(DEFAULT_CHANNEL);
            }

            for channel in channels_to_try {
                let meta = DispatchMeta {
                    mission_run_id: run_id.clone(),
                    node_id: FALLBACK_NODE_ID.to_string(),
                    output_index: outputs.len(),
                };
                let outcomes = self
                    .channels
                    .dispatch(channel, &fallback_text, &mission.chat_ids, &scope, &meta)
                    .await;
                let ok = outcomes.iter().any(|o| o.ok);
                outputs.push(OutputResult {
                    node_id: format!("{FALLBACK_NODE_ID}:{channel}"),
                    ok,
                    error: outcomes.iter().find_map(|o| o.error.clone()),
                });
                if ok {
                    break;
                }
            }
        }

        // 8. Overall outcome and telemetry.
        let ok = outputs.is_empty() || outputs.iter().any(|o| o.ok);
        let duration_ms = elapsed_ms(&self.clock);
        if ok {
            info!(
                mission = %mission.id,
                run = %run_id,
                duration_ms,
                outputs = outputs.len(),
                nodes = traces.len(),
                "mission.run.completed"
            );
        } else {
            error!(
                mission = %mission.id,
                run = %run_id,
                duration_ms,
                outputs = outputs.len(),
                "mission.run.failed"
            );
        }

        ExecuteMissionResult {
            ok,
            skipped: false,
            reason: None,
            error_code: None,
            outputs,
            node_traces: traces,
            duration_ms,
            day_stamp: Some(day_stamp),
        }
    }

    fn trace(
        &self,
        node: &nova_core::node::MissionNode,
        status: TraceStatus,
        detail: Option<String>,
    ) -> NodeTrace {
        NodeTrace {
            node_id: node.id.clone(),
            label: node.label.clone(),
            status,
            detail,
            text_preview: None,
            artifact_ref: None,
            at_ms: self.clock.epoch_ms(),
        }
    }

    async fn emit(
        &self,
        traces: &mut Vec<NodeTrace>,
        sink: &Option<TraceSink>,
        trace: NodeTrace,
    ) {
        if let Some(sink) = sink {
            sink(trace.clone()).await;
        }
        traces.push(trace);
    }

    fn fail_run(
        &self,
        mission: &Mission,
        run_id: &str,
        reason: impl Into<String>,
        error_code: &'static str,
        started: std::time::Instant,
    ) -> ExecuteMissionResult {
        let reason = reason.into();
        let duration_ms = self.clock.now().duration_since(started).as_millis() as u64;
        error!(
            mission = %mission.id,
            run = %run_id,
            duration_ms,
            code = error_code,
            reason = %reason,
            "mission.run.failed"
        );
        ExecuteMissionResult::failure(reason, Some(error_code), Vec::new(), duration_ms)
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
