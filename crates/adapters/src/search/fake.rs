// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake search adapter for tests.

use super::{SearchAdapter, SearchError, SearchResponse, SearchResult};
use async_trait::async_trait;
use nova_core::UserScope;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// One recorded search request.
#[derive(Debug, Clone)]
pub struct SearchCall {
    pub query: String,
    pub user_context_id: String,
}

#[derive(Default)]
struct Inner {
    calls: Vec<SearchCall>,
    responses: VecDeque<Result<Vec<SearchResult>, SearchError>>,
}

/// Records queries and plays back scripted result lists. With no script,
/// returns an empty result list.
#[derive(Clone, Default)]
pub struct FakeSearchAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl FakeSearchAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_results(&self, results: Vec<SearchResult>) {
        self.inner.lock().responses.push_back(Ok(results));
    }

    pub fn enqueue_error(&self, message: impl Into<String>) {
        self.inner
            .lock()
            .responses
            .push_back(Err(SearchError::Provider {
                provider: "fake".to_string(),
                message: message.into(),
            }));
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl SearchAdapter for FakeSearchAdapter {
    async fn search(&self, query: &str, scope: &UserScope)
        -> Result<SearchResponse, SearchError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SearchCall {
            query: query.to_string(),
            user_context_id: scope.user_context_id.clone(),
        });
        let results = inner.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(SearchResponse {
            search_url: format!("https://search.example/?q={query}"),
            provider: "fake".to_string(),
            results,
        })
    }
}
