// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user mission store.
//!
//! All mutations for a user are serialized through one async mutex, so a
//! concurrent upsert and delete can never interleave their
//! read-modify-write cycles. Deletes leave a tombstone id behind that the
//! legacy-schedule migration consults before re-importing anything.

use crate::kit::{atomic_write_json, read_json_or_bak, StoreError};
use crate::paths::{sanitize_user_id, StorePaths};
use chrono::{DateTime, Utc};
use nova_core::mission::{
    DeleteReason, Mission, MissionConnection, MissionSettings, MissionStatus, MissionVariable,
    RunStatus,
};
use nova_core::node::MissionNode;
use nova_core::{Clock, IdGen};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

fn default_file_version() -> u32 {
    1
}

/// On-disk shape of `<user>/missions.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionFile {
    #[serde(default = "default_file_version")]
    pub version: u32,
    #[serde(default)]
    pub missions: Vec<Mission>,
    /// Tombstones: ids deleted by the user, never re-imported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_ids: Vec<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrated_at: Option<DateTime<Utc>>,
}

impl MissionFile {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            version: 1,
            missions: Vec::new(),
            deleted_ids: Vec::new(),
            updated_at: now,
            migrated_at: None,
        }
    }
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub ok: bool,
    pub deleted: bool,
    pub reason: DeleteReason,
}

/// Inputs for the mission factory.
#[derive(Debug, Clone, Default)]
pub struct NewMission {
    pub user_id: String,
    pub label: String,
    pub description: String,
    pub integration: Option<String>,
    pub chat_ids: Vec<String>,
    pub timezone: Option<String>,
    pub nodes: Vec<MissionNode>,
    pub connections: Vec<MissionConnection>,
    pub variables: Vec<MissionVariable>,
    pub status: MissionStatus,
}

/// Execution-metadata update recorded after a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub ran_at: DateTime<Utc>,
    /// Local day stamp to record on successful delivery.
    pub day_stamp: Option<String>,
    /// Clear a one-shot `scheduledAtOverride` once consumed.
    pub clear_override: bool,
}

/// Legacy global schedule record, pre mission model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySchedule {
    id: String,
    user_id: String,
    #[serde(alias = "name")]
    label: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    days: Vec<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    integration: Option<String>,
    #[serde(default)]
    chat_ids: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

/// Per-user mission CRUD with tombstones and legacy migration.
pub struct MissionStore<C: Clock, G: IdGen> {
    paths: StorePaths,
    clock: C,
    id_gen: G,
    /// One async mutex per user; all read-modify-write goes through it.
    serializers: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Users whose legacy migration already ran in this process.
    migrated: Mutex<HashSet<String>>,
}

impl<C: Clock, G: IdGen> MissionStore<C, G> {
    pub fn new(paths: StorePaths, clock: C, id_gen: G) -> Self {
        Self {
            paths,
            clock,
            id_gen,
            serializers: Mutex::new(HashMap::new()),
            migrated: Mutex::new(HashSet::new()),
        }
    }

    fn user_serializer(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let key = sanitize_user_id(user_id);
        let mut map = self.serializers.lock();
        map.entry(key)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn missions_file(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        self.paths
            .missions_file(user_id)
            .ok_or_else(|| StoreError::MissingUserContext(user_id.to_string()))
    }

    fn read_file(&self, path: &PathBuf) -> Result<MissionFile, StoreError> {
        Ok(read_json_or_bak(path)?.unwrap_or_else(|| MissionFile::empty(self.clock.utc_now())))
    }

    /// Load a user's missions: run one-shot legacy migration, then read,
    /// normalize, and scrub tombstoned entries.
    pub async fn load_missions(&self, user_id: &str) -> Result<Vec<Mission>, StoreError> {
        let serializer = self.user_serializer(user_id);
        let _guard = serializer.lock().await;

        let path = self.missions_file(user_id)?;
        let mut file = self.read_file(&path)?;

        if self.migrate_legacy(user_id, &mut file) {
            atomic_write_json(&path, &file)?;
        }

        let tombstones: HashSet<&str> = file.deleted_ids.iter().map(String::as_str).collect();
        let caller = sanitize_user_id(user_id);
        let mut seen = HashSet::new();
        let missions = file
            .missions
            .into_iter()
            .filter(|m| {
                if m.id.is_empty() || !seen.insert(m.id.clone()) {
                    warn!(user = %caller, "dropping mission with empty or duplicate id");
                    return false;
                }
                if sanitize_user_id(&m.user_id) != caller {
                    warn!(user = %caller, mission = %m.id, "dropping cross-user mission record");
                    return false;
                }
                !tombstones.contains(m.id.as_str())
            })
            .collect();
        Ok(missions)
    }

    /// Insert or update a mission, preserving accumulated execution
    /// metadata unless the incoming record explicitly carries its own.
    pub async fn upsert_mission(
        &self,
        mut mission: Mission,
        user_id: &str,
    ) -> Result<Mission, StoreError> {
        let caller = sanitize_user_id(user_id);
        if caller.is_empty() {
            return Err(StoreError::MissingUserContext(user_id.to_string()));
        }
        if sanitize_user_id(&mission.user_id) != caller {
            return Err(StoreError::CrossUser {
                owner: mission.user_id.clone(),
                caller: user_id.to_string(),
            });
        }

        let serializer = self.user_serializer(user_id);
        let _guard = serializer.lock().await;

        let path = self.missions_file(user_id)?;
        let mut file = self.read_file(&path)?;
        let now = self.clock.utc_now();

        if let Some(existing) = file.missions.iter().find(|m| m.id == mission.id) {
            mission.last_run_at = mission.last_run_at.or(existing.last_run_at);
            mission.last_sent_local_date = mission
                .last_sent_local_date
                .clone()
                .or_else(|| existing.last_sent_local_date.clone());
            mission.last_run_status = mission.last_run_status.or(existing.last_run_status);
            if mission.run_count == 0 {
                mission.run_count = existing.run_count;
                mission.success_count = existing.success_count;
                mission.failure_count = existing.failure_count;
            }
            mission.created_at = existing.created_at;
        }

        mission.updated_at = now;
        mission.bump_version();

        match file.missions.iter_mut().find(|m| m.id == mission.id) {
            Some(slot) => *slot = mission.clone(),
            None => file.missions.push(mission.clone()),
        }
        file.updated_at = now;

        atomic_write_json(&path, &file)?;
        Ok(mission)
    }

    /// Remove a mission and tombstone its id.
    pub async fn delete_mission(
        &self,
        mission_id: &str,
        user_id: &str,
    ) -> Result<DeleteOutcome, StoreError> {
        if sanitize_user_id(user_id).is_empty() {
            return Ok(DeleteOutcome {
                ok: false,
                deleted: false,
                reason: DeleteReason::InvalidUser,
            });
        }

        let serializer = self.user_serializer(user_id);
        let _guard = serializer.lock().await;

        let path = self.missions_file(user_id)?;
        let mut file = self.read_file(&path)?;
        let before = file.missions.len();
        file.missions.retain(|m| m.id != mission_id);
        let deleted = file.missions.len() < before;

        if deleted {
            if !file.deleted_ids.iter().any(|id| id == mission_id) {
                file.deleted_ids.push(mission_id.to_string());
            }
            file.updated_at = self.clock.utc_now();
            atomic_write_json(&path, &file)?;
            info!(user = %sanitize_user_id(user_id), mission = %mission_id, "mission deleted");
        }

        Ok(DeleteOutcome {
            ok: true,
            deleted,
            reason: if deleted {
                DeleteReason::Deleted
            } else {
                DeleteReason::NotFound
            },
        })
    }

    /// Record a run's outcome on the mission's execution metadata.
    pub async fn record_run_outcome(
        &self,
        mission_id: &str,
        user_id: &str,
        outcome: RunOutcome,
    ) -> Result<(), StoreError> {
        let serializer = self.user_serializer(user_id);
        let _guard = serializer.lock().await;

        let path = self.missions_file(user_id)?;
        let mut file = self.read_file(&path)?;
        let now = self.clock.utc_now();

        let Some(mission) = file.missions.iter_mut().find(|m| m.id == mission_id) else {
            return Ok(());
        };

        mission.last_run_status = Some(outcome.status);
        match outcome.status {
            RunStatus::Success => {
                mission.last_run_at = Some(outcome.ran_at);
                mission.run_count = mission.run_count.saturating_add(1);
                mission.success_count = mission.success_count.saturating_add(1);
            }
            RunStatus::Failed => {
                mission.last_run_at = Some(outcome.ran_at);
                mission.run_count = mission.run_count.saturating_add(1);
                mission.failure_count = mission.failure_count.saturating_add(1);
            }
            // A skipped run is not a run: leave lastRunAt and the
            // counters alone so interval gating still fires.
            RunStatus::Skipped => {}
        }
        if let Some(stamp) = outcome.day_stamp {
            mission.last_sent_local_date = Some(stamp);
        }
        if outcome.clear_override {
            mission.scheduled_at_override = None;
        }
        mission.updated_at = now;
        file.updated_at = now;

        atomic_write_json(&path, &file)?;
        Ok(())
    }

    /// Mission factory with default settings and timezone.
    pub fn build_mission(&self, input: NewMission) -> Mission {
        let now = self.clock.utc_now();
        Mission {
            id: self.id_gen.next(),
            user_id: input.user_id,
            label: input.label,
            description: input.description,
            category: None,
            tags: Vec::new(),
            status: input.status,
            version: 1,
            integration: input.integration,
            chat_ids: input.chat_ids,
            created_at: now,
            updated_at: now,
            last_run_at: None,
            last_sent_local_date: None,
            run_count: 0,
            success_count: 0,
            failure_count: 0,
            last_run_status: None,
            scheduled_at_override: None,
            nodes: input.nodes,
            connections: input.connections,
            variables: input.variables,
            settings: MissionSettings {
                timezone: input.timezone.unwrap_or_else(|| "UTC".to_string()),
                ..MissionSettings::default()
            },
        }
    }

    /// One-shot legacy-schedule import for a user. Returns true when the
    /// file changed. Tombstoned ids are never re-imported.
    fn migrate_legacy(&self, user_id: &str, file: &mut MissionFile) -> bool {
        let caller = sanitize_user_id(user_id);
        {
            let mut migrated = self.migrated.lock();
            if !migrated.insert(caller.clone()) {
                return false;
            }
        }

        let legacy_path = self.paths.legacy_schedules_file();
        let legacy: Vec<LegacySchedule> = match read_json_or_bak(&legacy_path) {
            Ok(Some(rows)) => rows,
            Ok(None) => return false,
            Err(e) => {
                warn!(path = %legacy_path.display(), error = %e, "legacy schedule file unreadable");
                return false;
            }
        };

        let tombstones: HashSet<&str> = file.deleted_ids.iter().map(String::as_str).collect();
        let present: HashSet<String> = file.missions.iter().map(|m| m.id.clone()).collect();
        let mut imported = 0usize;

        for schedule in legacy {
            if sanitize_user_id(&schedule.user_id) != caller
                || tombstones.contains(schedule.id.as_str())
                || present.contains(&schedule.id)
            {
                continue;
            }
            let mission = self.mission_from_legacy(&schedule);
            file.missions.push(mission);
            imported += 1;
        }

        if imported > 0 {
            let now = self.clock.utc_now();
            file.migrated_at = Some(now);
            file.updated_at = now;
            info!(user = %caller, imported, "migrated legacy schedules");
            true
        } else {
            false
        }
    }

    fn mission_from_legacy(&self, schedule: &LegacySchedule) -> Mission {
        let mode = if schedule.days.is_empty() {
            "daily"
        } else {
            "weekly"
        };
        let trigger = serde_json::json!({
            "id": "trigger",
            "label": "Schedule",
            "type": "schedule-trigger",
            "mode": mode,
            "time": schedule.time,
            "timezone": schedule.timezone,
            "days": schedule.days,
        });
        let generate = serde_json::json!({
            "id": "generate",
            "label": "Generate",
            "type": "ai-generate",
            "prompt": schedule.prompt,
        });
        let channel = schedule.integration.as_deref().unwrap_or("novachat");
        let output = serde_json::json!({
            "id": "output",
            "label": "Deliver",
            "type": format!("{channel}-output"),
            "recipients": schedule.chat_ids,
        });

        let nodes: Vec<MissionNode> = [trigger, generate, output]
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        let connections = vec![
            MissionConnection {
                id: "c1".to_string(),
                source_node_id: "trigger".to_string(),
                source_port: "main".to_string(),
                target_node_id: "generate".to_string(),
                target_port: None,
            },
            MissionConnection {
                id: "c2".to_string(),
                source_node_id: "generate".to_string(),
                source_port: "main".to_string(),
                target_node_id: "output".to_string(),
                target_port: None,
            },
        ];

        let now = self.clock.utc_now();
        Mission {
            id: schedule.id.clone(),
            user_id: schedule.user_id.clone(),
            label: schedule.label.clone(),
            description: schedule.prompt.clone(),
            category: None,
            tags: Vec::new(),
            status: if schedule.enabled {
                MissionStatus::Active
            } else {
                MissionStatus::Paused
            },
            version: 1,
            integration: schedule.integration.clone(),
            chat_ids: schedule.chat_ids.clone(),
            created_at: now,
            updated_at: now,
            last_run_at: None,
            last_sent_local_date: None,
            run_count: 0,
            success_count: 0,
            failure_count: 0,
            last_run_status: None,
            scheduled_at_override: None,
            nodes,
            connections,
            variables: Vec::new(),
            settings: MissionSettings {
                timezone: schedule
                    .timezone
                    .clone()
                    .unwrap_or_else(|| "UTC".to_string()),
                ..MissionSettings::default()
            },
        }
    }
}

#[cfg(test)]
#[path = "missions_tests.rs"]
mod tests;
