// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nova-storage: per-tenant file-backed persistence for the Nova engine.
//!
//! All user-visible state lives in per-user JSON files under
//! `<workspace>/.agent/user-context/<userContextId>/`. Writes are atomic
//! (tmp + `.bak` + rename) and readers fall back to `.bak` once on a
//! corrupt primary.

pub mod idempotency;
pub mod kit;
pub mod missions;
pub mod paths;
pub mod sessions;

pub use idempotency::{
    resolve_key, IdempotencyRow, IdempotencyStatus, IdempotencyStore, ReserveInput, ReserveOutcome,
};
pub use kit::{atomic_write_json, atomic_write_text, read_json_or_bak, FsLock, StoreError};
pub use missions::{DeleteOutcome, MissionFile, MissionStore, NewMission, RunOutcome};
pub use paths::{sanitize_user_id, user_context_root, workspace_root, StorePaths};
pub use sessions::{
    compose_session_key, resolve_user_context_id, ResolvedSession, SessionEntry, SessionKeyInput,
    SessionPolicy, SessionStore, TranscriptTurn,
};
