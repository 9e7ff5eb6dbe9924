// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Web search adapters

mod noop;

pub use noop::NoOpSearchAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSearchAdapter, SearchCall};

use async_trait::async_trait;
use nova_core::UserScope;
use thiserror::Error;

/// Errors from search requests. An empty result list is NOT an error;
/// it means no usable data.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("search provider {provider} failed: {message}")]
    Provider { provider: String, message: String },
}

/// One search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A completed search request.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub search_url: String,
    pub provider: String,
    pub results: Vec<SearchResult>,
}

/// Adapter for web search.
#[async_trait]
pub trait SearchAdapter: Clone + Send + Sync + 'static {
    async fn search(&self, query: &str, scope: &UserScope)
        -> Result<SearchResponse, SearchError>;
}
