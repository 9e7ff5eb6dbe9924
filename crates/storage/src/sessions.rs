// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user session store and transcripts.
//!
//! Sessions live in `<user>/state/sessions.json` keyed by session key;
//! each session's transcript is an append-only JSONL file named by the
//! session id. Session keys are deterministic compositions of agent,
//! source, and sender, and every key resolves to exactly one user
//! context. Unresolvable callers get a deterministic hashed fake
//! context so isolation still holds.

use crate::kit::{atomic_write_json, atomic_write_text, read_json_or_bak, StoreError};
use crate::paths::StorePaths;
use indexmap::IndexMap;
use nova_core::Clock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// In-memory transcript cache TTL.
const TRANSCRIPT_CACHE_TTL: Duration = Duration::from_secs(30);
/// Minimum interval between transcript retention sweeps.
const PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// One session record, keyed by session key in the user store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub session_id: String,
    pub session_key: String,
    pub user_context_id: String,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub context_tokens: u64,
}

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptTurn {
    pub role: String,
    pub content: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Session behavior tuning, read from the environment.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub idle_ms: u64,
    pub max_transcript_lines: usize,
    pub retention_days: u64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_ms: 45 * 60 * 1000,
            max_transcript_lines: 400,
            retention_days: 14,
        }
    }
}

impl SessionPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let idle_minutes = std::env::var("NOVA_SESSION_IDLE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok());
        Self {
            idle_ms: idle_minutes
                .map(|m| m * 60 * 1000)
                .unwrap_or(defaults.idle_ms),
            max_transcript_lines: std::env::var("NOVA_SESSION_MAX_TRANSCRIPT_LINES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_transcript_lines),
            retention_days: std::env::var("NOVA_SESSION_TRANSCRIPT_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retention_days),
        }
    }
}

/// Inputs for key composition and user-context resolution.
#[derive(Debug, Clone, Default)]
pub struct SessionKeyInput {
    /// Explicit key; wins over composition when present.
    pub session_key_hint: Option<String>,
    pub source: String,
    pub agent: String,
    pub sender: Option<String>,
    pub user_context_id: Option<String>,
    /// HUD tab key; defaults to `main`.
    pub main_key: Option<String>,
    /// Force a fresh session id regardless of idle state.
    pub reset: bool,
}

/// What a resolve call hands back to the chat pipeline.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session_key: String,
    pub user_context_id: String,
    pub entry: SessionEntry,
    pub transcript: Vec<TranscriptTurn>,
    /// True when a new session id was minted (first turn or idle reset).
    pub fresh: bool,
}

struct CachedTranscript {
    turns: Vec<TranscriptTurn>,
    loaded_at: Instant,
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

/// Compose the deterministic session key for a caller.
pub fn compose_session_key(input: &SessionKeyInput, user_context_id: &str) -> String {
    if let Some(hint) = &input.session_key_hint {
        let hint = hint.trim();
        if !hint.is_empty() {
            return hint.to_string();
        }
    }
    let agent = if input.agent.is_empty() {
        "nova"
    } else {
        &input.agent
    };
    match input.source.as_str() {
        "hud" => {
            let main_key = input.main_key.as_deref().unwrap_or("main");
            if user_context_id.is_empty() {
                format!("agent:{agent}:hud:{main_key}")
            } else {
                format!("agent:{agent}:hud:user:{user_context_id}:{main_key}")
            }
        }
        "voice" => {
            let sender = input.sender.as_deref().unwrap_or("local-mic");
            format!("agent:{agent}:voice:dm:{sender}")
        }
        source => {
            let sender = input.sender.as_deref().unwrap_or("anonymous");
            format!("agent:{agent}:{source}:dm:{sender}")
        }
    }
}

/// Resolve the tenant for a caller. Never empty: callers that cannot be
/// attributed get a deterministic hashed fake context.
pub fn resolve_user_context_id(input: &SessionKeyInput) -> String {
    if let Some(explicit) = &input.user_context_id {
        if !explicit.is_empty() {
            return if explicit.starts_with("hud-user:") {
                explicit.clone()
            } else {
                format!("hud-user:{explicit}")
            };
        }
    }
    if let Some(sender) = &input.sender {
        if sender.starts_with("hud-user:") {
            return sender.clone();
        }
        if input.source == "voice" && !sender.is_empty() {
            return format!("voice:{sender}");
        }
    }
    if let Some(hint) = &input.session_key_hint {
        if let Some(parsed) = parse_user_from_key(hint) {
            return parsed;
        }
    }
    let key = compose_session_key(input, "");
    let source = if input.source.is_empty() {
        "unknown"
    } else {
        &input.source
    };
    format!("{source}-{}", short_hash(&key))
}

/// Extract the `user:<uctx>` segment from a composed session key.
fn parse_user_from_key(key: &str) -> Option<String> {
    let mut parts = key.split(':').peekable();
    while let Some(part) = parts.next() {
        if part == "user" {
            let uctx: Vec<&str> = parts.clone().collect();
            if uctx.is_empty() {
                return None;
            }
            // The user context may itself contain colons (hud-user:42);
            // everything up to the trailing main key belongs to it.
            let joined = uctx.join(":");
            return match joined.rsplit_once(':') {
                Some((user, _main_key)) if !user.is_empty() => Some(user.to_string()),
                _ => Some(joined),
            };
        }
    }
    None
}

type SessionMap = IndexMap<String, SessionEntry>;

/// Per-user session store with transcript management.
pub struct SessionStore<C: Clock> {
    paths: StorePaths,
    clock: C,
    policy: SessionPolicy,
    /// Keyed by transcript path, not session id: two tenants may carry
    /// the same session id and must never share cache entries.
    cache: Mutex<HashMap<PathBuf, CachedTranscript>>,
    last_prune: Mutex<Option<Instant>>,
    legacy_migrated: Mutex<bool>,
}

impl<C: Clock> SessionStore<C> {
    pub fn new(paths: StorePaths, clock: C, policy: SessionPolicy) -> Self {
        Self {
            paths,
            clock,
            policy,
            cache: Mutex::new(HashMap::new()),
            last_prune: Mutex::new(None),
            legacy_migrated: Mutex::new(false),
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Resolve the session for an incoming turn: compose the key, find or
    /// mint the entry, refresh its activity stamp, and load the transcript.
    pub fn resolve_session_context(
        &self,
        input: &SessionKeyInput,
    ) -> Result<ResolvedSession, StoreError> {
        let user_context_id = resolve_user_context_id(input);
        let session_key = compose_session_key(input, &user_context_id);

        self.maybe_prune_transcripts(&user_context_id);
        self.migrate_legacy_sessions();

        let path = self.sessions_file(&user_context_id)?;
        let mut sessions: SessionMap = read_json_or_bak(&path)?.unwrap_or_default();
        let now = self.clock.epoch_ms();

        let existing = sessions.get(&session_key);
        let idle = existing
            .map(|e| now.saturating_sub(e.updated_at) > self.policy.idle_ms)
            .unwrap_or(true);
        let fresh = input.reset || idle;

        let entry = if fresh {
            let entry = SessionEntry {
                session_id: uuid::Uuid::new_v4().to_string(),
                session_key: session_key.clone(),
                user_context_id: user_context_id.clone(),
                created_at: now,
                updated_at: now,
                model: String::new(),
                input_tokens: 0,
                output_tokens: 0,
                total_tokens: 0,
                context_tokens: 0,
            };
            sessions.insert(session_key.clone(), entry.clone());
            entry
        } else {
            // !fresh implies the entry exists.
            let Some(entry) = sessions.get_mut(&session_key) else {
                return Err(StoreError::MissingUserContext(session_key));
            };
            entry.updated_at = now;
            entry.clone()
        };

        atomic_write_json(&path, &sessions)?;

        let transcript = self.load_transcript(&entry.session_id, Some(&user_context_id))?;
        Ok(ResolvedSession {
            session_key,
            user_context_id,
            entry,
            transcript,
            fresh,
        })
    }

    /// Add token usage onto a session entry after a completed turn.
    pub fn record_usage(
        &self,
        user_context_id: &str,
        session_key: &str,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        context_tokens: u64,
    ) -> Result<(), StoreError> {
        let path = self.sessions_file(user_context_id)?;
        let mut sessions: SessionMap = read_json_or_bak(&path)?.unwrap_or_default();
        let Some(entry) = sessions.get_mut(session_key) else {
            return Ok(());
        };
        entry.model = model.to_string();
        entry.input_tokens += input_tokens;
        entry.output_tokens += output_tokens;
        entry.total_tokens += input_tokens + output_tokens;
        entry.context_tokens = context_tokens;
        entry.updated_at = self.clock.epoch_ms();
        atomic_write_json(&path, &sessions)?;
        Ok(())
    }

    /// Append a turn and trim the transcript to the line cap, oldest
    /// first. On a cache miss the transcript is rehydrated from disk
    /// first, so an append never collapses history to the single new turn.
    pub fn append_transcript_turn(
        &self,
        user_context_id: &str,
        session_id: &str,
        role: &str,
        content: &str,
        meta: Option<Value>,
    ) -> Result<(), StoreError> {
        let path = self.transcript_path(user_context_id, session_id)?;

        let mut turns = {
            let cache = self.cache.lock();
            match cache.get(&path) {
                Some(cached) if cached.loaded_at.elapsed() < TRANSCRIPT_CACHE_TTL => {
                    cached.turns.clone()
                }
                _ => read_transcript_file(&path),
            }
        };

        turns.push(TranscriptTurn {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: self.clock.epoch_ms(),
            meta,
        });
        if turns.len() > self.policy.max_transcript_lines {
            let excess = turns.len() - self.policy.max_transcript_lines;
            turns.drain(..excess);
        }

        write_transcript_file(&path, &turns)?;

        self.cache.lock().insert(
            path,
            CachedTranscript {
                turns,
                loaded_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Load a transcript, merging the legacy global file when both exist.
    pub fn load_transcript(
        &self,
        session_id: &str,
        user_context_id: Option<&str>,
    ) -> Result<Vec<TranscriptTurn>, StoreError> {
        let scoped = user_context_id.and_then(|u| self.paths.transcript_file(u, session_id));
        let legacy = self.paths.legacy_transcript_file(session_id);
        let cache_key = scoped.clone().unwrap_or_else(|| legacy.clone());

        {
            let cache = self.cache.lock();
            if let Some(cached) = cache.get(&cache_key) {
                if cached.loaded_at.elapsed() < TRANSCRIPT_CACHE_TTL {
                    return Ok(cached.turns.clone());
                }
            }
        }

        let turns = match scoped {
            Some(scoped_path) if scoped_path.exists() && legacy.exists() => merge_transcripts(
                read_transcript_file(&scoped_path),
                read_transcript_file(&legacy),
            ),
            Some(scoped_path) if scoped_path.exists() => read_transcript_file(&scoped_path),
            _ if legacy.exists() => read_transcript_file(&legacy),
            _ => Vec::new(),
        };

        self.cache.lock().insert(
            cache_key,
            CachedTranscript {
                turns: turns.clone(),
                loaded_at: Instant::now(),
            },
        );
        Ok(turns)
    }

    fn sessions_file(&self, user_context_id: &str) -> Result<PathBuf, StoreError> {
        self.paths
            .sessions_file(user_context_id)
            .ok_or_else(|| StoreError::MissingUserContext(user_context_id.to_string()))
    }

    fn transcript_path(
        &self,
        user_context_id: &str,
        session_id: &str,
    ) -> Result<PathBuf, StoreError> {
        match self.paths.transcript_file(user_context_id, session_id) {
            Some(path) => Ok(path),
            // Unattributable callers fall back to the legacy location.
            None => Ok(self.paths.legacy_transcript_file(session_id)),
        }
    }

    /// Move legacy global session entries into their user-scoped stores.
    /// Runs at most once per process, and only while the legacy file
    /// still exists.
    fn migrate_legacy_sessions(&self) {
        {
            let mut done = self.legacy_migrated.lock();
            if *done {
                return;
            }
            *done = true;
        }

        let legacy_path = self.paths.legacy_sessions_file();
        let legacy: SessionMap = match read_json_or_bak(&legacy_path) {
            Ok(Some(map)) => map,
            _ => return,
        };
        if legacy.is_empty() {
            return;
        }

        let mut by_user: HashMap<String, SessionMap> = HashMap::new();
        for (key, entry) in legacy {
            let user = if entry.user_context_id.is_empty() {
                format!("legacy-{}", short_hash(&key))
            } else {
                entry.user_context_id.clone()
            };
            by_user.entry(user).or_default().insert(key, entry);
        }

        let mut migrated_users = 0usize;
        for (user, entries) in by_user {
            let Some(path) = self.paths.sessions_file(&user) else {
                continue;
            };
            let mut scoped: SessionMap = match read_json_or_bak(&path) {
                Ok(found) => found.unwrap_or_default(),
                Err(_) => continue,
            };
            for (key, entry) in entries {
                scoped.entry(key).or_insert(entry);
            }
            if atomic_write_json(&path, &scoped).is_ok() {
                migrated_users += 1;
            }
        }

        if migrated_users > 0 {
            info!(users = migrated_users, "migrated legacy global sessions");
            let _ = std::fs::remove_file(&legacy_path);
        }
    }

    /// Delete transcript files past the retention window. Throttled to
    /// one sweep per 10 minutes.
    fn maybe_prune_transcripts(&self, user_context_id: &str) {
        {
            let mut last = self.last_prune.lock();
            if let Some(at) = *last {
                if at.elapsed() < PRUNE_INTERVAL {
                    return;
                }
            }
            *last = Some(Instant::now());
        }

        let Some(dir) = self.paths.transcripts_dir(user_context_id) else {
            return;
        };
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return;
        };
        let cutoff = Duration::from_secs(self.policy.retention_days * 24 * 60 * 60);
        for entry in entries.flatten() {
            let path = entry.path();
            let stale = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|m| m.elapsed().ok())
                .map(|age| age > cutoff)
                .unwrap_or(false);
            if stale {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "transcript prune failed");
                }
            }
        }
    }
}

fn read_transcript_file(path: &PathBuf) -> Vec<TranscriptTurn> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}

fn write_transcript_file(path: &PathBuf, turns: &[TranscriptTurn]) -> Result<(), StoreError> {
    let mut out = String::new();
    for turn in turns {
        out.push_str(&serde_json::to_string(turn)?);
        out.push('\n');
    }
    atomic_write_text(path, &out)
}

/// Merge scoped and legacy transcripts, deduplicating by
/// `(timestamp, role, content)` and preserving order.
fn merge_transcripts(
    scoped: Vec<TranscriptTurn>,
    legacy: Vec<TranscriptTurn>,
) -> Vec<TranscriptTurn> {
    let mut seen: std::collections::HashSet<(u64, String, String)> = std::collections::HashSet::new();
    let mut merged = Vec::with_capacity(scoped.len() + legacy.len());
    for turn in legacy.into_iter().chain(scoped) {
        let key = (turn.timestamp, turn.role.clone(), turn.content.clone());
        if seen.insert(key) {
            merged.push(turn);
        }
    }
    merged.sort_by_key(|t| t.timestamp);
    merged
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
