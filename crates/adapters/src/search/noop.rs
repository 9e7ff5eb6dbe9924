// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op search adapter.

use super::{SearchAdapter, SearchError, SearchResponse};
use async_trait::async_trait;
use nova_core::UserScope;

/// Returns no results for every query.
#[derive(Clone, Default)]
pub struct NoOpSearchAdapter;

#[async_trait]
impl SearchAdapter for NoOpSearchAdapter {
    async fn search(
        &self,
        query: &str,
        _scope: &UserScope,
    ) -> Result<SearchResponse, SearchError> {
        Ok(SearchResponse {
            search_url: format!("about:blank#{query}"),
            provider: "noop".to_string(),
            results: Vec::new(),
        })
    }
}
