// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide in-flight slot accounting for mission runs.
//!
//! One slot per `(user, run)` pair, bounded globally and per user, with
//! a TTL so a crashed run cannot pin a slot forever. Instantiable so
//! tests get fresh state; production uses the [`default_guard`] instance.

use crate::config::GuardConfig;
use nova_storage::sanitize_user_id;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Rejection from slot acquisition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct GuardError {
    pub reason: String,
}

impl GuardError {
    pub fn code(&self) -> &'static str {
        "concurrency_blocked"
    }
}

#[derive(Debug, Clone)]
struct Slot {
    user_context_id: String,
    started_at_ms: u64,
}

/// Inflight slot map with caps and TTL pruning.
#[derive(Clone)]
pub struct ExecutionGuard {
    config: GuardConfig,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl ExecutionGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquire a slot for one mission run.
    ///
    /// Unsanitizable inputs yield a no-op slot rather than an error: the
    /// call path that loses its user attribution should not be able to
    /// run unguarded, but it also must not crash.
    pub fn acquire(
        &self,
        user_context_id: &str,
        mission_run_id: &str,
        now_ms: u64,
    ) -> Result<SlotGuard, GuardError> {
        let user = sanitize_user_id(user_context_id);
        let run = sanitize_user_id(mission_run_id);
        if user.is_empty() || run.is_empty() {
            return Ok(SlotGuard::noop());
        }
        let key = format!("{user}:{run}");

        let mut slots = self.slots.lock();

        // Drop slots past their TTL before judging the caps.
        slots.retain(|_, slot| now_ms.saturating_sub(slot.started_at_ms) < self.config.slot_ttl_ms);

        if slots.len() >= self.config.global_inflight_limit {
            return Err(GuardError {
                reason: format!(
                    "global cap reached ({} mission runs in flight)",
                    slots.len()
                ),
            });
        }
        let user_inflight = slots
            .values()
            .filter(|s| s.user_context_id == user)
            .count();
        if user_inflight >= self.config.per_user_inflight_limit {
            return Err(GuardError {
                reason: format!(
                    "per-user cap reached ({user_inflight} mission runs in flight for {user})"
                ),
            });
        }

        slots.insert(
            key.clone(),
            Slot {
                user_context_id: user,
                started_at_ms: now_ms,
            },
        );

        Ok(SlotGuard {
            slots: Some(Arc::clone(&self.slots)),
            key,
        })
    }

    /// Current slot count (for introspection and tests).
    pub fn in_flight(&self) -> usize {
        self.slots.lock().len()
    }
}

/// RAII slot. Dropping releases; releasing an already-pruned slot is
/// benign.
#[derive(Debug)]
pub struct SlotGuard {
    slots: Option<Arc<Mutex<HashMap<String, Slot>>>>,
    key: String,
}

impl SlotGuard {
    fn noop() -> Self {
        Self {
            slots: None,
            key: String::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.slots.is_none()
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Some(slots) = &self.slots {
            slots.lock().remove(&self.key);
        }
    }
}

/// The process-wide guard used by production call sites.
pub fn default_guard() -> &'static ExecutionGuard {
    static GUARD: LazyLock<ExecutionGuard> =
        LazyLock::new(|| ExecutionGuard::new(GuardConfig::from_env()));
    &GUARD
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
