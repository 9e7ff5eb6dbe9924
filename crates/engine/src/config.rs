// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning from environment variables.
//!
//! Every knob has a default; unparseable values fall back silently.

use crate::scheduler::Lane;
use std::time::Duration;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Mission executor limits.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock cap for one mission run.
    pub max_run_duration: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_run_duration: Duration::from_millis(300_000),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            max_run_duration: Duration::from_millis(env_u64(
                "NOVA_MISSION_MAX_DURATION_MS",
                300_000,
            )),
        }
    }
}

/// ExecutionGuard limits.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub per_user_inflight_limit: usize,
    pub global_inflight_limit: usize,
    pub slot_ttl_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            per_user_inflight_limit: 3,
            global_inflight_limit: 200,
            slot_ttl_ms: 900_000,
        }
    }
}

impl GuardConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            per_user_inflight_limit: env_usize(
                "NOVA_MISSION_EXECUTION_MAX_INFLIGHT_PER_USER",
                defaults.per_user_inflight_limit,
            ),
            global_inflight_limit: env_usize(
                "NOVA_MISSION_EXECUTION_MAX_INFLIGHT_GLOBAL",
                defaults.global_inflight_limit,
            ),
            slot_ttl_ms: env_u64("NOVA_MISSION_EXECUTION_SLOT_TTL_MS", defaults.slot_ttl_ms),
        }
    }
}

/// RequestScheduler limits and lane weights.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_in_flight_global: usize,
    pub max_in_flight_per_user: usize,
    pub max_in_flight_per_conversation: usize,
    pub max_queue_size: usize,
    pub max_queue_size_per_user: usize,
    pub queue_stale_ms: u64,
    pub supersede_queued_by_key: bool,
    /// When on, the global in-flight cap is effectively unlimited and
    /// only per-user caps bound concurrency.
    pub strict_user_isolation: bool,
    /// Lane weights, flattened into the round-robin vector.
    pub lane_weights: Vec<(Lane, u32)>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_in_flight_global: 4,
            max_in_flight_per_user: 1,
            max_in_flight_per_conversation: 1,
            max_queue_size: 64,
            max_queue_size_per_user: 8,
            queue_stale_ms: 120_000,
            supersede_queued_by_key: true,
            strict_user_isolation: false,
            lane_weights: vec![
                (Lane::Fast, 3),
                (Lane::Default, 2),
                (Lane::Tool, 2),
                (Lane::Background, 1),
            ],
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_in_flight_global: env_usize(
                "NOVA_SCHEDULER_MAX_INFLIGHT_GLOBAL",
                defaults.max_in_flight_global,
            ),
            max_in_flight_per_user: env_usize(
                "NOVA_SCHEDULER_MAX_INFLIGHT_PER_USER",
                defaults.max_in_flight_per_user,
            ),
            max_in_flight_per_conversation: env_usize(
                "NOVA_SCHEDULER_MAX_INFLIGHT_PER_CONVERSATION",
                defaults.max_in_flight_per_conversation,
            ),
            max_queue_size: env_usize("NOVA_SCHEDULER_MAX_QUEUE_SIZE", defaults.max_queue_size),
            max_queue_size_per_user: env_usize(
                "NOVA_SCHEDULER_MAX_QUEUE_SIZE_PER_USER",
                defaults.max_queue_size_per_user,
            ),
            queue_stale_ms: env_u64("NOVA_SCHEDULER_QUEUE_STALE_MS", defaults.queue_stale_ms),
            supersede_queued_by_key: env_bool(
                "NOVA_SCHEDULER_SUPERSEDE_QUEUED",
                defaults.supersede_queued_by_key,
            ),
            strict_user_isolation: env_bool(
                "NOVA_SCHEDULER_STRICT_USER_ISOLATION",
                defaults.strict_user_isolation,
            ),
            lane_weights: parse_lane_weights(
                std::env::var("NOVA_SCHEDULER_LANE_WEIGHTS").ok().as_deref(),
            )
            .unwrap_or(defaults.lane_weights),
        }
    }
}

/// Parse `fast=3,default=2,tool=2,background=1`.
fn parse_lane_weights(raw: Option<&str>) -> Option<Vec<(Lane, u32)>> {
    let raw = raw?;
    let mut weights = Vec::new();
    for pair in raw.split(',') {
        let (name, weight) = pair.split_once('=')?;
        let lane = match name.trim() {
            "fast" => Lane::Fast,
            "default" => Lane::Default,
            "tool" => Lane::Tool,
            "background" => Lane::Background,
            _ => return None,
        };
        weights.push((lane, weight.trim().parse().ok()?));
    }
    if weights.is_empty() {
        None
    } else {
        Some(weights)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
