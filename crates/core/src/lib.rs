// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nova-core: Domain model and pure logic for the Nova mission engine

pub mod clock;
pub mod context;
pub mod expr;
pub mod graph;
pub mod id;
pub mod mission;
pub mod node;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{
    ExecutionContext, NodeOutput, NodeTrace, RunSource, TraceStatus, UserScope, SKIPPED_KEY,
};
pub use expr::{resolve, ResolveEnv};
pub use graph::{reachable, topo_order, TopoResult};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use mission::{
    DeleteReason, Mission, MissionConnection, MissionSettings, MissionStatus, MissionVariable,
    RunStatus, PORT_ERROR, PORT_MAIN,
};
pub use node::{
    CombineMode, ConditionOp, ConditionRule, MissionNode, NodeFamily, NodeKind, NodePayload,
    Position, ScheduleMode, ScheduleTriggerConfig,
};

crate::define_id! {
    /// Unique identifier for a mission.
    ///
    /// Stable across runs and versions; the addressing key for per-user
    /// mission storage and tombstones.
    pub struct MissionId;
}

crate::define_id! {
    /// Unique identifier for a single mission run.
    #[derive(Default)]
    pub struct RunId;
}

crate::define_id! {
    /// Sanitized tenant identifier; the root of all per-user persistence.
    #[derive(Default)]
    pub struct UserContextId;
}
