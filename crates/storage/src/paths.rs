// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path resolution for per-user persistence.
//!
//! The workspace root is the nearest ancestor of the working directory
//! that contains a `hud/` directory (the platform checkout shape), else
//! the working directory itself. `NOVA_WORKSPACE_DIR` overrides discovery
//! for tests and embedded deployments.

use std::path::{Path, PathBuf};

/// Maximum length of a sanitized user context id.
const MAX_USER_ID_LEN: usize = 96;

/// Sanitize a tenant identifier for filesystem use.
///
/// Lowercases, maps anything outside `[a-z0-9_-]` to `-`, collapses
/// repeated `-`, strips leading/trailing `-`, and truncates to 96 chars.
/// Returns an empty string for unusable input; callers must refuse I/O
/// for an empty id.
pub fn sanitize_user_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_USER_ID_LEN));
    let mut last_dash = false;
    for c in raw.chars() {
        let mapped = match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '_') => Some(c),
            '-' => Some('-'),
            _ => None,
        };
        let c = mapped.unwrap_or('-');
        if c == '-' {
            if last_dash {
                continue;
            }
            last_dash = true;
        } else {
            last_dash = false;
        }
        out.push(c);
        if out.len() >= MAX_USER_ID_LEN {
            break;
        }
    }
    out.trim_matches('-').to_string()
}

/// Discover the workspace root starting from `base`.
pub fn workspace_root_from(base: &Path) -> PathBuf {
    let mut current = Some(base);
    while let Some(dir) = current {
        if dir.join("hud").is_dir() {
            return dir.to_path_buf();
        }
        current = dir.parent();
    }
    base.to_path_buf()
}

/// Discover the workspace root from the environment.
pub fn workspace_root() -> PathBuf {
    if let Ok(dir) = std::env::var("NOVA_WORKSPACE_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    workspace_root_from(&cwd)
}

/// Per-user persistence root: `<root>/.agent/user-context/<sanitized>`.
///
/// Returns `None` when the user id sanitizes to empty.
pub fn user_context_root(root: &Path, user_id: &str) -> Option<PathBuf> {
    let sanitized = sanitize_user_id(user_id);
    if sanitized.is_empty() {
        return None;
    }
    Some(root.join(".agent").join("user-context").join(sanitized))
}

/// Well-known file locations under a workspace root.
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Discover from the environment (`NOVA_WORKSPACE_DIR`, else `hud/`
    /// ancestor scan, else CWD).
    pub fn discover() -> Self {
        Self::new(workspace_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_root(&self, user_id: &str) -> Option<PathBuf> {
        user_context_root(&self.root, user_id)
    }

    pub fn sessions_file(&self, user_id: &str) -> Option<PathBuf> {
        Some(self.user_root(user_id)?.join("state").join("sessions.json"))
    }

    pub fn transcript_file(&self, user_id: &str, session_id: &str) -> Option<PathBuf> {
        Some(
            self.user_root(user_id)?
                .join("transcripts")
                .join(format!("{session_id}.jsonl")),
        )
    }

    pub fn transcripts_dir(&self, user_id: &str) -> Option<PathBuf> {
        Some(self.user_root(user_id)?.join("transcripts"))
    }

    pub fn missions_file(&self, user_id: &str) -> Option<PathBuf> {
        Some(self.user_root(user_id)?.join("missions.json"))
    }

    pub fn idempotency_file(&self, user_id: &str) -> Option<PathBuf> {
        Some(
            self.user_root(user_id)?
                .join("mission-build-idempotency.json"),
        )
    }

    pub fn idempotency_lock(&self, user_id: &str) -> Option<PathBuf> {
        Some(
            self.user_root(user_id)?
                .join("mission-build-idempotency.lock"),
        )
    }

    /// Legacy global session store, pre user scoping.
    pub fn legacy_sessions_file(&self) -> PathBuf {
        self.root.join(".agent").join("state").join("sessions.json")
    }

    /// Legacy global transcript location, pre user scoping.
    pub fn legacy_transcript_file(&self, session_id: &str) -> PathBuf {
        self.root
            .join(".agent")
            .join("transcripts")
            .join(format!("{session_id}.jsonl"))
    }

    /// Legacy global schedule list missions are migrated from.
    pub fn legacy_schedules_file(&self) -> PathBuf {
        self.root.join(".agent").join("schedules.json")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
