// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn meta(index: usize) -> DispatchMeta {
    DispatchMeta {
        mission_run_id: "run-1".to_string(),
        node_id: "n1".to_string(),
        output_index: index,
    }
}

#[tokio::test]
async fn dispatch_records_and_succeeds() {
    let fake = FakeChannelAdapter::new();
    let outcomes = fake
        .dispatch(
            "telegram",
            "hello",
            &["123".to_string()],
            &UserScope::new("u1"),
            &meta(0),
        )
        .await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].ok);
    assert_eq!(fake.texts_for("telegram"), vec!["hello"]);
}

#[tokio::test]
async fn failing_channel_reports_error() {
    let fake = FakeChannelAdapter::new();
    fake.fail_channel("discord");
    let outcomes = fake
        .dispatch("discord", "x", &[], &UserScope::new("u1"), &meta(0))
        .await;
    assert!(!outcomes[0].ok);
    assert!(outcomes[0].error.as_deref().unwrap().contains("discord"));
}

#[tokio::test]
async fn replayed_meta_is_idempotent() {
    let fake = FakeChannelAdapter::new();
    let first = fake
        .dispatch("telegram", "once", &[], &UserScope::new("u1"), &meta(0))
        .await;
    let second = fake
        .dispatch("telegram", "once", &[], &UserScope::new("u1"), &meta(0))
        .await;
    assert!(first[0].ok && second[0].ok);
    // Only one delivery was recorded.
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn distinct_output_indexes_deliver_separately() {
    let fake = FakeChannelAdapter::new();
    fake.dispatch("telegram", "a", &[], &UserScope::new("u1"), &meta(0))
        .await;
    fake.dispatch("telegram", "b", &[], &UserScope::new("u1"), &meta(1))
        .await;
    assert_eq!(fake.calls().len(), 2);
}
