// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op channel adapter.

use super::{ChannelAdapter, DispatchMeta, DispatchOutcome};
use async_trait::async_trait;
use nova_core::UserScope;
use tracing::info;

/// Logs deliveries instead of sending them. Every dispatch succeeds.
#[derive(Clone, Default)]
pub struct NoOpChannelAdapter;

#[async_trait]
impl ChannelAdapter for NoOpChannelAdapter {
    async fn dispatch(
        &self,
        channel: &str,
        text: &str,
        recipients: &[String],
        _scope: &UserScope,
        meta: &DispatchMeta,
    ) -> Vec<DispatchOutcome> {
        info!(
            channel,
            recipients = recipients.len(),
            run = %meta.mission_run_id,
            node = %meta.node_id,
            chars = text.len(),
            "dispatch (noop)"
        );
        vec![DispatchOutcome::delivered()]
    }
}
