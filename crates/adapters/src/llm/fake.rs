// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake LLM adapter for tests.

use super::{LlmAdapter, LlmCompletion, LlmError};
use async_trait::async_trait;
use nova_core::UserScope;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// One recorded completion request.
#[derive(Debug, Clone)]
pub struct LlmCall {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub user_context_id: String,
}

#[derive(Default)]
struct Inner {
    calls: Vec<LlmCall>,
    responses: VecDeque<Result<String, LlmError>>,
    echo: bool,
}

/// Records calls and plays back scripted responses. With no script, an
/// echo fake returns the user text; otherwise it fails.
#[derive(Clone, Default)]
pub struct FakeLlmAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl FakeLlmAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake that completes every request with the user text verbatim.
    pub fn echo() -> Self {
        let fake = Self::default();
        fake.inner.lock().echo = true;
        fake
    }

    /// Queue a successful completion text.
    pub fn enqueue_text(&self, text: impl Into<String>) {
        self.inner.lock().responses.push_back(Ok(text.into()));
    }

    /// Queue a provider failure.
    pub fn enqueue_error(&self, message: impl Into<String>) {
        self.inner.lock().responses.push_back(Err(LlmError::Provider {
            provider: "fake".to_string(),
            message: message.into(),
        }));
    }

    pub fn calls(&self) -> Vec<LlmCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl LlmAdapter for FakeLlmAdapter {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        scope: &UserScope,
    ) -> Result<LlmCompletion, LlmError> {
        let mut inner = self.inner.lock();
        inner.calls.push(LlmCall {
            system: system.to_string(),
            user: user.to_string(),
            max_tokens,
            user_context_id: scope.user_context_id.clone(),
        });
        let response = match inner.responses.pop_front() {
            Some(scripted) => scripted,
            None if inner.echo => Ok(user.to_string()),
            None => Err(LlmError::NotConfigured),
        };
        response.map(|text| LlmCompletion {
            provider: "fake".to_string(),
            model: "fake-1".to_string(),
            text,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
