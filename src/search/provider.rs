//! Search provider contract

use crate::models::Page;
use crate::search::config::SearchConfig;
use crate::search::error::ProviderResult;
use crate::state::PageStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One ranked hit: a page and its provider-defined relevance score
///
/// Higher scores are more relevant. The scale is up to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    page: Page,
    score: f32,
}

impl SearchResult {
    pub fn new(page: Page, score: f32) -> Self {
        Self { page, score }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn into_page(self) -> Page {
        self.page
    }
}

/// A pluggable indexing and query backend
///
/// Implementations synchronize internally; every method may be called
/// concurrently from several tasks once `initialize` has returned.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Registry name of this provider
    fn name(&self) -> &'static str;

    /// One-time setup: open or create index storage.
    ///
    /// Calling it again after a successful initialization is a no-op.
    async fn initialize(
        &self,
        store: Arc<dyn PageStore>,
        config: &SearchConfig,
    ) -> ProviderResult<()>;

    /// Run a query in the provider's native syntax.
    ///
    /// An empty or unmatched query yields an empty list.
    async fn find_pages(&self, query: &str) -> ProviderResult<Vec<SearchResult>>;

    /// Run a query, skipping the first `offset` hits
    async fn find_pages_with_offset(
        &self,
        query: &str,
        offset: usize,
    ) -> ProviderResult<Vec<SearchResult>> {
        let results = self.find_pages(query).await?;
        Ok(results.into_iter().skip(offset).collect())
    }

    /// Run a query, skipping `offset` hits and returning at most `limit`.
    ///
    /// Providers that pay per resolved hit override this to stop early.
    async fn find_pages_with_limit(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> ProviderResult<Vec<SearchResult>> {
        let results = self.find_pages_with_offset(query, offset).await?;
        Ok(results.into_iter().take(limit).collect())
    }

    /// Bring the index up to date with `page`. Idempotent.
    async fn reindex_page(&self, page: &Page) -> ProviderResult<()>;

    /// Drop `page` from the index. Removing an absent page succeeds.
    async fn page_removed(&self, page: &Page) -> ProviderResult<()>;

    /// Flush and release index storage
    async fn close(&self) -> ProviderResult<()> {
        Ok(())
    }
}
