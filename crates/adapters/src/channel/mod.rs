// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel dispatch adapters

mod noop;

pub use noop::NoOpChannelAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DispatchCall, FakeChannelAdapter};

use async_trait::async_trait;
use nova_core::UserScope;

/// Identifies one delivery attempt so transports can deduplicate.
///
/// Implementations MUST be idempotent for the same
/// `(mission_run_id, node_id, output_index)` triple: redelivering after
/// a retry must not produce a second message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchMeta {
    pub mission_run_id: String,
    pub node_id: String,
    pub output_index: usize,
}

/// Result of one delivery attempt, per recipient batch.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub ok: bool,
    pub error: Option<String>,
    pub status: Option<u16>,
}

impl DispatchOutcome {
    pub fn delivered() -> Self {
        Self {
            ok: true,
            error: None,
            status: Some(200),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            status: None,
        }
    }
}

/// Adapter for delivering mission output over a named channel
/// (`telegram`, `discord`, `email`, `webhook`, `slack`, `novachat`).
#[async_trait]
pub trait ChannelAdapter: Clone + Send + Sync + 'static {
    async fn dispatch(
        &self,
        channel: &str,
        text: &str,
        recipients: &[String],
        scope: &UserScope,
        meta: &DispatchMeta,
    ) -> Vec<DispatchOutcome>;
}
