// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake channel adapter for tests.

use super::{ChannelAdapter, DispatchMeta, DispatchOutcome};
use async_trait::async_trait;
use nova_core::UserScope;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One recorded delivery.
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub channel: String,
    pub text: String,
    pub recipients: Vec<String>,
    pub user_context_id: String,
    pub meta: DispatchMeta,
}

#[derive(Default)]
struct Inner {
    calls: Vec<DispatchCall>,
    failing_channels: HashSet<String>,
    delivered: HashMap<DispatchMeta, DispatchOutcome>,
}

/// Records dispatches, fails scripted channels, and deduplicates by
/// `DispatchMeta`: replaying a triple returns the first outcome without
/// recording a second delivery, per the adapter's idempotency contract.
#[derive(Clone, Default)]
pub struct FakeChannelAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl FakeChannelAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every dispatch on `channel` fail.
    pub fn fail_channel(&self, channel: impl Into<String>) {
        self.inner.lock().failing_channels.insert(channel.into());
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.inner.lock().calls.clone()
    }

    /// Texts delivered on a channel, in order.
    pub fn texts_for(&self, channel: &str) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.channel == channel)
            .map(|c| c.text.clone())
            .collect()
    }
}

#[async_trait]
impl ChannelAdapter for FakeChannelAdapter {
    async fn dispatch(
        &self,
        channel: &str,
        text: &str,
        recipients: &[String],
        scope: &UserScope,
        meta: &DispatchMeta,
    ) -> Vec<DispatchOutcome> {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.delivered.get(meta) {
            return vec![previous.clone()];
        }

        inner.calls.push(DispatchCall {
            channel: channel.to_string(),
            text: text.to_string(),
            recipients: recipients.to_vec(),
            user_context_id: scope.user_context_id.clone(),
            meta: meta.clone(),
        });

        let outcome = if inner.failing_channels.contains(channel) {
            DispatchOutcome::failed(format!("channel {channel} unavailable"))
        } else {
            DispatchOutcome::delivered()
        };
        inner.delivered.insert(meta.clone(), outcome.clone());
        vec![outcome]
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
