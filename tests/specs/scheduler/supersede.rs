// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! At most one queued job per supersede key; displaced jobs
//! reject with `superseded`.

use nova_engine::{EnqueueRequest, Lane, RequestScheduler, SchedulerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn blocking_scheduler() -> RequestScheduler {
    RequestScheduler::new(SchedulerConfig {
        max_in_flight_global: 1,
        ..SchedulerConfig::default()
    })
}

fn keyed(user: &str, key: &str) -> EnqueueRequest {
    EnqueueRequest {
        lane: Lane::Default,
        user_id: Some(user.to_string()),
        conversation_id: None,
        supersede_key: Some(key.to_string()),
    }
}

#[tokio::test]
async fn repeated_enqueues_keep_at_most_one_queued_job_per_key() {
    let scheduler = blocking_scheduler();
    let gate = Arc::new(Notify::new());

    // Occupy the single slot.
    let running = {
        let scheduler = scheduler.clone();
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            scheduler
                .enqueue(
                    EnqueueRequest {
                        lane: Lane::Default,
                        user_id: Some("carol".to_string()),
                        conversation_id: None,
                        supersede_key: None,
                    },
                    move || async move {
                        gate.notified().await;
                        "done"
                    },
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Three drafts of the same work; each displaces the previous.
    let mut handles = Vec::new();
    for i in 0..3 {
        let scheduler_clone = scheduler.clone();
        handles.push(tokio::spawn(async move {
            scheduler_clone
                .enqueue(keyed("alice", "draft:99"), move || async move { i })
                .await
        }));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(scheduler.queued() <= 2); // carol is running, one keyed job max
    }

    // The first two rejected as superseded; the last one runs.
    let first = handles.remove(0).await.unwrap();
    let second = handles.remove(0).await.unwrap();
    assert_eq!(first.unwrap_err().code(), "superseded");
    assert_eq!(second.unwrap_err().code(), "superseded");

    gate.notify_one();
    assert_eq!(running.await.unwrap().unwrap(), "done");
    let last = handles.remove(0).await.unwrap();
    assert_eq!(last.unwrap(), 2);
}
