// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nova-engine: mission execution, request scheduling, and run guards.

pub mod config;
pub mod executor;
pub mod executors;
pub mod gate;
pub mod guard;
pub mod scheduler;

pub use config::{EngineConfig, GuardConfig, SchedulerConfig};
pub use executor::{
    ExecuteMissionInput, ExecuteMissionResult, MissionExecutor, OutputResult, TraceSink,
};
pub use executors::{ExecutorRegistry, NodeExecError, NodeExecutor};
pub use gate::{local_day_stamp, should_mission_run_now, GateDecision};
pub use guard::{default_guard, ExecutionGuard, GuardError, SlotGuard};
pub use scheduler::{EnqueueRequest, Lane, RequestScheduler, SchedulerError};
