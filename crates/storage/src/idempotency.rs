// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency reservations for mission-build requests.
//!
//! A deterministic fingerprint of the build inputs maps to a reservation
//! row with a short pending TTL and a longer completed/failed TTL. The
//! server always recomputes the key; client-provided keys are ignored.
//! Rows live in a per-user JSON file guarded by an advisory lockfile,
//! since concurrent build requests may arrive from multiple processes.

use crate::kit::{atomic_write_json, read_json_or_bak, FsLock, StoreError, DEFAULT_LOCK_TIMEOUT};
use crate::paths::{sanitize_user_id, StorePaths};
use nova_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// TTL for a reservation that has not been finalized.
const PENDING_TTL_MS: u64 = 120_000;
/// TTL for a completed or failed reservation.
const FINAL_TTL_MS: u64 = 300_000;
/// Bounds for the retry hint returned on a pending hit.
const RETRY_MIN_MS: u64 = 250;
const RETRY_MAX_MS: u64 = 4000;
/// Longest prompt prefix that participates in the fingerprint.
const PROMPT_FINGERPRINT_CHARS: usize = 1200;

/// Reservation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdempotencyStatus {
    Pending,
    Completed,
    Failed,
}

/// One persisted reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyRow {
    pub key: String,
    pub status: IdempotencyStatus,
    pub created_at: u64,
    pub updated_at: u64,
    pub expires_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Inputs that participate in the build fingerprint.
#[derive(Debug, Clone, Default)]
pub struct ReserveInput {
    pub user_context_id: String,
    pub prompt: String,
    pub deploy: bool,
    pub timezone: String,
    pub enabled: bool,
}

/// What a reserve call resolved to.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// This caller owns the build; proceed and finalize.
    Started { key: String },
    /// Another identical request is in flight.
    Pending { key: String, retry_after_ms: u64 },
    /// An identical request already completed.
    Completed { key: String, result: Value },
    /// An identical request already failed.
    Failed { key: String, error: String },
}

impl ReserveOutcome {
    pub fn key(&self) -> &str {
        match self {
            ReserveOutcome::Started { key }
            | ReserveOutcome::Pending { key, .. }
            | ReserveOutcome::Completed { key, .. }
            | ReserveOutcome::Failed { key, .. } => key,
        }
    }
}

/// Normalize a prompt for fingerprinting: collapse whitespace, lowercase,
/// trim, truncate.
fn normalize_prompt(prompt: &str) -> String {
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .to_lowercase()
        .trim()
        .chars()
        .take(PROMPT_FINGERPRINT_CHARS)
        .collect()
}

/// Compute the reservation key for a set of build inputs.
///
/// `mission-build:<userScope>:<first 32 hex chars of sha256(seed)>`.
pub fn resolve_key(input: &ReserveInput) -> Result<String, StoreError> {
    let user_scope = sanitize_user_id(&input.user_context_id);
    if user_scope.is_empty() {
        return Err(StoreError::MissingUserContext(
            input.user_context_id.clone(),
        ));
    }
    let seed = format!(
        "{}|{}|{}|{}|{}",
        user_scope,
        normalize_prompt(&input.prompt),
        input.deploy,
        input.timezone,
        input.enabled,
    );
    let digest = Sha256::digest(seed.as_bytes());
    let hex = format!("{digest:x}");
    Ok(format!("mission-build:{}:{}", user_scope, &hex[..32]))
}

/// Per-user reservation store.
pub struct IdempotencyStore<C: Clock> {
    paths: StorePaths,
    clock: C,
}

impl<C: Clock> IdempotencyStore<C> {
    pub fn new(paths: StorePaths, clock: C) -> Self {
        Self { paths, clock }
    }

    /// Reserve a build slot for the fingerprint of `input`.
    ///
    /// Exactly one caller per fingerprint gets `Started` within the
    /// pending TTL window; others observe `Pending` (with a retry hint)
    /// or the finalized outcome.
    pub fn reserve(&self, input: &ReserveInput) -> Result<ReserveOutcome, StoreError> {
        let key = resolve_key(input)?;
        let now = self.clock.epoch_ms();
        let (file, lock_file) = self.files(&input.user_context_id)?;
        let _lock = FsLock::acquire(&lock_file, DEFAULT_LOCK_TIMEOUT)?;

        let mut rows: Vec<IdempotencyRow> = read_json_or_bak(&file)?.unwrap_or_default();
        rows.retain(|r| r.expires_at > now);

        let outcome = match rows.iter().find(|r| r.key == key) {
            None => {
                rows.push(IdempotencyRow {
                    key: key.clone(),
                    status: IdempotencyStatus::Pending,
                    created_at: now,
                    updated_at: now,
                    expires_at: now + PENDING_TTL_MS,
                    result: None,
                    error: None,
                });
                ReserveOutcome::Started { key }
            }
            Some(row) => match row.status {
                IdempotencyStatus::Pending => {
                    let remaining = row.expires_at.saturating_sub(now);
                    ReserveOutcome::Pending {
                        key,
                        retry_after_ms: remaining.clamp(RETRY_MIN_MS, RETRY_MAX_MS),
                    }
                }
                IdempotencyStatus::Completed if row.result.is_some() => {
                    ReserveOutcome::Completed {
                        key,
                        result: row.result.clone().unwrap_or(Value::Null),
                    }
                }
                _ => ReserveOutcome::Failed {
                    key,
                    error: row
                        .error
                        .clone()
                        .unwrap_or_else(|| "mission build failed".to_string()),
                },
            },
        };

        atomic_write_json(&file, &rows)?;
        Ok(outcome)
    }

    /// Finalize a reservation. Unknown keys are silently ignored.
    pub fn finalize(
        &self,
        user_context_id: &str,
        key: &str,
        ok: bool,
        result: Option<Value>,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let now = self.clock.epoch_ms();
        let (file, lock_file) = self.files(user_context_id)?;
        let _lock = FsLock::acquire(&lock_file, DEFAULT_LOCK_TIMEOUT)?;

        let mut rows: Vec<IdempotencyRow> = read_json_or_bak(&file)?.unwrap_or_default();
        let Some(row) = rows.iter_mut().find(|r| r.key == key) else {
            return Ok(());
        };

        row.status = if ok {
            IdempotencyStatus::Completed
        } else {
            IdempotencyStatus::Failed
        };
        row.result = result;
        row.error = error;
        row.updated_at = now;
        row.expires_at = now + FINAL_TTL_MS;

        atomic_write_json(&file, &rows)?;
        Ok(())
    }

    fn files(&self, user_context_id: &str) -> Result<(std::path::PathBuf, std::path::PathBuf), StoreError> {
        let file = self
            .paths
            .idempotency_file(user_context_id)
            .ok_or_else(|| StoreError::MissingUserContext(user_context_id.to_string()))?;
        let lock = self
            .paths
            .idempotency_lock(user_context_id)
            .ok_or_else(|| StoreError::MissingUserContext(user_context_id.to_string()))?;
        Ok((file, lock))
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
