// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op LLM adapter for deployments without a provider.

use super::{LlmAdapter, LlmCompletion, LlmError};
use async_trait::async_trait;
use nova_core::UserScope;

/// Always fails with `NotConfigured`; AI nodes surface the failure as a
/// normal node error rather than crashing the run.
#[derive(Clone, Default)]
pub struct NoOpLlmAdapter;

#[async_trait]
impl LlmAdapter for NoOpLlmAdapter {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _max_tokens: u32,
        _scope: &UserScope,
    ) -> Result<LlmCompletion, LlmError> {
        Err(LlmError::NotConfigured)
    }
}
