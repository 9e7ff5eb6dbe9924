// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the spec suite.

use nova_adapters::{FakeChannelAdapter, FakeLlmAdapter, FakeSearchAdapter};
use nova_core::mission::Mission;
use nova_core::test_support::MissionBuilder;
use nova_core::{FakeClock, SequentialIdGen};
use nova_engine::{
    EngineConfig, ExecutionGuard, ExecutorRegistry, GuardConfig, MissionExecutor,
};
use serde_json::json;
use std::sync::Arc;

pub type SpecExecutor = MissionExecutor<FakeChannelAdapter, FakeClock, SequentialIdGen>;

pub struct Harness {
    pub executor: SpecExecutor,
    pub channels: FakeChannelAdapter,
    pub llm: FakeLlmAdapter,
    pub clock: FakeClock,
}

/// Executor wired to fakes, with the clock parked at
/// 2026-03-13 13:00 UTC (09:00 America/New_York).
pub fn harness() -> Harness {
    harness_with_guard(GuardConfig::default())
}

pub fn harness_with_guard(guard: GuardConfig) -> Harness {
    let llm = FakeLlmAdapter::echo();
    let channels = FakeChannelAdapter::new();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_773_406_800_000);
    let registry = Arc::new(ExecutorRegistry::with_defaults(
        llm.clone(),
        FakeSearchAdapter::new(),
        channels.clone(),
    ));
    let executor = MissionExecutor::new(
        registry,
        channels.clone(),
        ExecutionGuard::new(guard),
        clock.clone(),
        SequentialIdGen::new("run"),
        EngineConfig::default(),
    );
    Harness {
        executor,
        channels,
        llm,
        clock,
    }
}

/// The canonical daily-digest mission:
/// `schedule-trigger daily 09:00 America/New_York` → fetch → ai → output.
pub fn daily_digest_mission(user: &str) -> Mission {
    MissionBuilder::new("digest-1", user)
        .label("Morning digest")
        .integration("novachat")
        .chat_id("123")
        .node(json!({
            "id": "trigger", "label": "Schedule", "type": "schedule-trigger",
            "mode": "daily", "time": "09:00", "timezone": "America/New_York",
        }))
        .node(json!({"id": "fetch", "label": "Fetch", "type": "format", "template": "A"}))
        .node(json!({"id": "ai", "label": "Summarize", "type": "ai-summarize"}))
        .node(json!({"id": "out", "label": "Deliver", "type": "novachat-output"}))
        .connect("trigger", "main", "fetch")
        .connect("fetch", "main", "ai")
        .connect("ai", "main", "out")
        .build()
}
