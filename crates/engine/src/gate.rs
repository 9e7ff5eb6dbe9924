// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule gate: is this mission due right now?
//!
//! Decisions are made in the mission's timezone. Missions without a
//! schedule trigger (manual or webhook driven) always pass the gate.
//!
//! The trigger's `time` field drives the outer scheduler's polling, not
//! this gate: once/daily/weekly dedupe purely on `lastSentLocalDate`
//! (weekly additionally on the weekday list), and interval mode on the
//! elapsed time since `lastRunAt`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use nova_core::mission::Mission;
use nova_core::node::{ScheduleMode, ScheduleTriggerConfig};
use tracing::warn;

/// Outcome of a gate check.
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub due: bool,
    pub reason: String,
    /// Local `YYYY-MM-DD` in the mission's timezone; recorded as
    /// `lastSentLocalDate` on successful delivery.
    pub day_stamp: String,
    pub mode: Option<ScheduleMode>,
    pub timezone: Option<String>,
}

fn parse_tz(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(timezone = name, "unknown timezone, falling back to UTC");
            Tz::UTC
        }
    }
}

/// Local `YYYY-MM-DD` stamp for `now` in the mission's timezone.
pub fn local_day_stamp(mission: &Mission, now: DateTime<Utc>) -> String {
    let tz = parse_tz(mission.timezone());
    now.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// Decide whether `mission` is due at `now`.
pub fn should_mission_run_now(mission: &Mission, now: DateTime<Utc>) -> GateDecision {
    let tz = parse_tz(mission.timezone());
    let local = now.with_timezone(&tz);
    let day_stamp = local.format("%Y-%m-%d").to_string();

    let Some(trigger) = mission.schedule_trigger() else {
        return GateDecision {
            due: true,
            reason: "no schedule trigger; gate open".to_string(),
            day_stamp,
            mode: None,
            timezone: Some(tz.name().to_string()),
        };
    };

    let decision = |due: bool, reason: String| GateDecision {
        due,
        reason,
        day_stamp: day_stamp.clone(),
        mode: Some(trigger.mode),
        timezone: Some(tz.name().to_string()),
    };

    // A one-shot override instant beats the trigger's own clock.
    if let Some(at) = mission.scheduled_at_override {
        return if now >= at {
            decision(true, "scheduled override reached".to_string())
        } else {
            decision(false, format!("scheduled override not reached ({at})"))
        };
    }

    match trigger.mode {
        ScheduleMode::Interval => interval_due(mission, trigger, now, decision),
        ScheduleMode::Once => {
            if mission
                .last_sent_local_date
                .as_deref()
                .is_none_or(str::is_empty)
            {
                decision(true, "due (not yet delivered)".to_string())
            } else {
                decision(false, "one-time mission already delivered".to_string())
            }
        }
        ScheduleMode::Daily => {
            if mission.last_sent_local_date.as_deref() == Some(day_stamp.as_str()) {
                decision(false, "Already ran today".to_string())
            } else {
                decision(true, format!("due (not yet sent on {day_stamp})"))
            }
        }
        ScheduleMode::Weekly => {
            let weekday = local.format("%a").to_string().to_lowercase();
            if !trigger
                .days
                .iter()
                .any(|d| d.to_lowercase().starts_with(&weekday))
            {
                decision(false, format!("not scheduled for {weekday}"))
            } else if mission.last_sent_local_date.as_deref() == Some(day_stamp.as_str()) {
                decision(false, "Already ran today".to_string())
            } else {
                decision(true, format!("due (scheduled for {weekday})"))
            }
        }
    }
}

fn interval_due(
    mission: &Mission,
    trigger: &ScheduleTriggerConfig,
    now: DateTime<Utc>,
    decision: impl Fn(bool, String) -> GateDecision,
) -> GateDecision {
    let minutes = i64::from(trigger.interval_minutes.unwrap_or(60).max(1));
    match mission.last_run_at {
        // First run is always due.
        None => decision(true, "first interval run".to_string()),
        Some(last) => {
            let elapsed = now.signed_duration_since(last);
            if elapsed >= chrono::Duration::minutes(minutes) {
                decision(true, format!("interval of {minutes}m elapsed"))
            } else {
                let remaining = minutes - elapsed.num_minutes();
                decision(false, format!("interval not elapsed ({remaining}m remaining)"))
            }
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
