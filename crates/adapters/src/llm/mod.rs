// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM completion adapters

mod noop;

pub use noop::NoOpLlmAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLlmAdapter, LlmCall};

use async_trait::async_trait;
use nova_core::UserScope;
use thiserror::Error;

/// Errors from LLM completion requests
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },
    #[error("no llm provider configured")]
    NotConfigured,
}

/// A completed LLM request.
#[derive(Debug, Clone)]
pub struct LlmCompletion {
    pub provider: String,
    pub model: String,
    pub text: String,
}

/// Adapter for LLM text completion.
///
/// `scope` identifies the tenant so providers can resolve per-user keys
/// and quotas.
#[async_trait]
pub trait LlmAdapter: Clone + Send + Sync + 'static {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        scope: &UserScope,
    ) -> Result<LlmCompletion, LlmError>;
}
