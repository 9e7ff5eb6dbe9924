// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lane-weighted bounded request scheduler.
//!
//! All user-scoped work (chat turns, mission runs) is admitted through
//! `enqueue`. Four lanes share capacity by weighted round-robin; strict
//! per-user and per-conversation in-flight caps hold even when a lane
//! has runnable work, so one user's burst cannot starve the rest for
//! more than a round-robin cycle. Queued (not running) work can be
//! displaced by a newer enqueue carrying the same supersede key.

use crate::config::SchedulerConfig;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

/// Retry hint attached to queue-full rejections.
const QUEUE_FULL_RETRY_MS: u64 = 1000;

/// Scheduling lane. Weights decide how often each lane wins the
/// round-robin draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Fast,
    Default,
    Tool,
    Background,
}

impl Lane {
    /// Declared order, used for the fallback scan.
    pub const ALL: [Lane; 4] = [Lane::Fast, Lane::Default, Lane::Tool, Lane::Background];

    pub fn name(&self) -> &'static str {
        match self {
            Lane::Fast => "fast",
            Lane::Default => "default",
            Lane::Tool => "tool",
            Lane::Background => "background",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rejection values surfaced to enqueue callers, each with a stable code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("queue full, retry in {retry_after_ms}ms")]
    QueueFull { retry_after_ms: u64 },
    #[error("queued job went stale")]
    QueueStale,
    #[error("superseded by a newer request")]
    Superseded,
    #[error("invalid job")]
    InvalidJob,
}

impl SchedulerError {
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::QueueFull { .. } => "queue_full",
            SchedulerError::QueueStale => "queue_stale",
            SchedulerError::Superseded => "superseded",
            SchedulerError::InvalidJob => "invalid_job",
        }
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            SchedulerError::QueueFull { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Admission parameters for one job.
#[derive(Debug, Clone, Default)]
pub struct EnqueueRequest {
    pub lane: Lane,
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    /// A newer enqueue with the same key displaces older *queued* jobs.
    pub supersede_key: Option<String>,
}

impl Default for Lane {
    fn default() -> Self {
        Lane::Default
    }
}

type FireFn = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;
type RejectFn = Box<dyn FnOnce(SchedulerError) + Send>;

struct QueuedJob {
    user_id: Option<String>,
    conversation_id: Option<String>,
    supersede_key: Option<String>,
    enqueued_at: Instant,
    fire: FireFn,
    reject: RejectFn,
}

struct State {
    lanes: HashMap<Lane, VecDeque<QueuedJob>>,
    /// Round-robin vector: each lane repeated `weight` times.
    rr: Vec<Lane>,
    cursor: usize,
    in_flight_global: usize,
    in_flight_by_user: HashMap<String, usize>,
    in_flight_by_conversation: HashMap<String, usize>,
}

impl State {
    fn total_queued(&self) -> usize {
        self.lanes.values().map(VecDeque::len).sum()
    }

    fn queued_for_user(&self, user_id: &str) -> usize {
        self.lanes
            .values()
            .flatten()
            .filter(|j| j.user_id.as_deref() == Some(user_id))
            .count()
    }
}

struct Inner {
    config: SchedulerConfig,
    state: Mutex<State>,
}

impl Inner {
    fn effective_global_cap(&self) -> usize {
        if self.config.strict_user_isolation {
            // Isolation mode: only per-user caps bound concurrency.
            usize::MAX
        } else {
            self.config.max_in_flight_global
        }
    }

    /// First queued job in `lane` that would not violate per-user or
    /// per-conversation caps. Ineligible jobs are skipped but keep their
    /// place, preserving FIFO among eligible jobs.
    fn eligible_pos(&self, state: &State, lane: Lane) -> Option<usize> {
        let queue = state.lanes.get(&lane)?;
        queue.iter().position(|job| {
            let user_ok = job.user_id.as_ref().is_none_or(|u| {
                state.in_flight_by_user.get(u).copied().unwrap_or(0)
                    < self.config.max_in_flight_per_user
            });
            let conversation_ok = job.conversation_id.as_ref().is_none_or(|c| {
                state.in_flight_by_conversation.get(c).copied().unwrap_or(0)
                    < self.config.max_in_flight_per_conversation
            });
            user_ok && conversation_ok
        })
    }

    /// Pick the next runnable job: weighted round-robin first, then a
    /// declared-order scan for lanes the round-robin vector misses.
    fn select_job(&self, state: &mut State) -> Option<QueuedJob> {
        let rr_len = state.rr.len();
        for i in 0..rr_len {
            let lane = state.rr[(state.cursor + i) % rr_len];
            if let Some(pos) = self.eligible_pos(state, lane) {
                state.cursor = (state.cursor + i + 1) % rr_len;
                return state.lanes.get_mut(&lane)?.remove(pos);
            }
        }
        for lane in Lane::ALL {
            if let Some(pos) = self.eligible_pos(state, lane) {
                return state.lanes.get_mut(&lane)?.remove(pos);
            }
        }
        None
    }

    fn dispatch(self: &Arc<Self>) {
        loop {
            let job = {
                let mut state = self.state.lock();
                if state.in_flight_global >= self.effective_global_cap() {
                    return;
                }
                let Some(job) = self.select_job(&mut state) else {
                    return;
                };
                state.in_flight_global += 1;
                if let Some(user) = &job.user_id {
                    *state.in_flight_by_user.entry(user.clone()).or_insert(0) += 1;
                }
                if let Some(conversation) = &job.conversation_id {
                    *state
                        .in_flight_by_conversation
                        .entry(conversation.clone())
                        .or_insert(0) += 1;
                }
                job
            };

            let inner = Arc::clone(self);
            let user_id = job.user_id.clone();
            let conversation_id = job.conversation_id.clone();
            let fire = job.fire;
            tokio::spawn(async move {
                fire().await;
                inner.finish(user_id, conversation_id);
            });
        }
    }

    fn finish(self: &Arc<Self>, user_id: Option<String>, conversation_id: Option<String>) {
        {
            let mut state = self.state.lock();
            state.in_flight_global = state.in_flight_global.saturating_sub(1);
            if let Some(user) = user_id {
                if let Some(count) = state.in_flight_by_user.get_mut(&user) {
                    *count -= 1;
                    if *count == 0 {
                        state.in_flight_by_user.remove(&user);
                    }
                }
            }
            if let Some(conversation) = conversation_id {
                if let Some(count) = state.in_flight_by_conversation.get_mut(&conversation) {
                    *count -= 1;
                    if *count == 0 {
                        state.in_flight_by_conversation.remove(&conversation);
                    }
                }
            }
        }
        self.dispatch();
    }
}

/// The scheduler handle. Clones share one queue.
#[derive(Clone)]
pub struct RequestScheduler {
    inner: Arc<Inner>,
}

impl RequestScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let mut rr = Vec::new();
        for (lane, weight) in &config.lane_weights {
            for _ in 0..*weight {
                rr.push(*lane);
            }
        }
        if rr.is_empty() {
            rr.push(Lane::Default);
        }
        let lanes = Lane::ALL
            .into_iter()
            .map(|lane| (lane, VecDeque::new()))
            .collect();
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    lanes,
                    rr,
                    cursor: 0,
                    in_flight_global: 0,
                    in_flight_by_user: HashMap::new(),
                    in_flight_by_conversation: HashMap::new(),
                }),
            }),
        }
    }

    pub fn from_env() -> Self {
        Self::new(SchedulerConfig::from_env())
    }

    /// Current queued job count across lanes (for introspection).
    pub fn queued(&self) -> usize {
        self.inner.state.lock().total_queued()
    }

    /// Current in-flight job count (for introspection).
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().in_flight_global
    }

    /// Admit a job. Resolves with the job's result once it ran, or
    /// rejects with a `SchedulerError` if it was displaced before
    /// starting. A job runs at most once; rejection is delivered exactly
    /// once.
    pub async fn enqueue<T, F, Fut>(
        &self,
        request: EnqueueRequest,
        run: F,
    ) -> Result<T, SchedulerError>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        if request.user_id.as_deref() == Some("")
            || request.conversation_id.as_deref() == Some("")
            || request.supersede_key.as_deref() == Some("")
        {
            return Err(SchedulerError::InvalidJob);
        }

        let (tx, rx) = oneshot::channel::<Result<T, SchedulerError>>();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let fire_slot = Arc::clone(&slot);
        let fire: FireFn = Box::new(move || {
            async move {
                let result = run().await;
                if let Some(tx) = fire_slot.lock().take() {
                    let _ = tx.send(Ok(result));
                }
            }
            .boxed()
        });
        let reject: RejectFn = Box::new(move |err| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(Err(err));
            }
        });

        let mut displaced: Vec<(RejectFn, SchedulerError)> = Vec::new();
        let admit = {
            let mut state = self.inner.state.lock();
            let stale_cutoff = Duration::from_millis(self.inner.config.queue_stale_ms);

            // Evict anything that has waited past the staleness window.
            for queue in state.lanes.values_mut() {
                let mut kept = VecDeque::with_capacity(queue.len());
                while let Some(job) = queue.pop_front() {
                    if job.enqueued_at.elapsed() > stale_cutoff {
                        displaced.push((job.reject, SchedulerError::QueueStale));
                    } else {
                        kept.push_back(job);
                    }
                }
                *queue = kept;
            }

            let admit = if state.total_queued() >= self.inner.config.max_queue_size {
                Err(SchedulerError::QueueFull {
                    retry_after_ms: QUEUE_FULL_RETRY_MS,
                })
            } else if request.user_id.as_ref().is_some_and(|u| {
                state.queued_for_user(u) >= self.inner.config.max_queue_size_per_user
            }) {
                Err(SchedulerError::QueueFull {
                    retry_after_ms: QUEUE_FULL_RETRY_MS,
                })
            } else {
                Ok(())
            };

            if admit.is_ok() {
                // Supersede matches queued jobs by key across all users;
                // a per-user restriction is a deliberate non-change (see
                // the tenant-isolation note in the design ledger).
                if self.inner.config.supersede_queued_by_key {
                    if let Some(key) = &request.supersede_key {
                        for queue in state.lanes.values_mut() {
                            let mut kept = VecDeque::with_capacity(queue.len());
                            while let Some(job) = queue.pop_front() {
                                if job.supersede_key.as_ref() == Some(key) {
                                    displaced.push((job.reject, SchedulerError::Superseded));
                                } else {
                                    kept.push_back(job);
                                }
                            }
                            *queue = kept;
                        }
                    }
                }

                let lane = request.lane;
                state
                    .lanes
                    .entry(lane)
                    .or_default()
                    .push_back(QueuedJob {
                        user_id: request.user_id.clone(),
                        conversation_id: request.conversation_id.clone(),
                        supersede_key: request.supersede_key.clone(),
                        enqueued_at: Instant::now(),
                        fire,
                        reject,
                    });
            }
            admit
        };

        for (reject_job, err) in displaced {
            debug!(code = err.code(), "displacing queued job");
            reject_job(err);
        }

        admit?;
        self.inner.dispatch();

        rx.await.unwrap_or(Err(SchedulerError::InvalidJob))
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
