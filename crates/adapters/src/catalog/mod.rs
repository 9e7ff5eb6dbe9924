// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration catalog adapters

use async_trait::async_trait;
use nova_core::UserScope;
use thiserror::Error;

/// Errors from catalog loads
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// One connectable integration, as shown to the builder and executor.
/// The executor treats the catalog as read-only.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: String,
    pub kind: String,
    pub connected: bool,
    pub endpoint: Option<String>,
    pub label: String,
}

/// Adapter for loading a user's integration catalog.
#[async_trait]
pub trait CatalogAdapter: Clone + Send + Sync + 'static {
    async fn load(&self, scope: &UserScope) -> Result<Vec<CatalogItem>, CatalogError>;
}

/// Catalog backed by a fixed item list. Doubles as the test fake.
#[derive(Clone, Default)]
pub struct StaticCatalogAdapter {
    items: Vec<CatalogItem>,
}

impl StaticCatalogAdapter {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl CatalogAdapter for StaticCatalogAdapter {
    async fn load(&self, _scope: &UserScope) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self.items.clone())
    }
}
