//! Linear-scan search provider
//!
//! Keeps the text of every page in memory and matches queries against it at
//! query time. No index storage; always available, which makes it the
//! fallback when the configured provider cannot be built.

use crate::models::{Page, PagePath};
use crate::search::config::SearchConfig;
use crate::search::error::{ProviderResult, SearchError};
use crate::search::provider::{SearchProvider, SearchResult};
use crate::search::query::ContentMatcher;
use crate::state::PageStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Simple substring-matching provider
pub struct BasicSearchProvider {
    pages: DashMap<PagePath, Page>,
    max_results: AtomicUsize,
}

impl BasicSearchProvider {
    pub const NAME: &'static str = "basic";

    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            max_results: AtomicUsize::new(SearchConfig::default().max_results),
        }
    }

    /// Number of pages currently held
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Default for BasicSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Descending score, then ascending page name
pub(crate) fn rank(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score()
        .partial_cmp(&a.score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.page().name().cmp(b.page().name()))
}

#[async_trait]
impl SearchProvider for BasicSearchProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn initialize(
        &self,
        store: Arc<dyn PageStore>,
        config: &SearchConfig,
    ) -> ProviderResult<()> {
        self.max_results
            .store(config.max_results.max(1), AtomicOrdering::Relaxed);

        let names = store
            .find_all_page_names()
            .await
            .map_err(|e| SearchError::Store(e.to_string()))?;

        for name in names {
            let path = PagePath::new(name);
            match store.get_page(&path).await {
                Ok(Some(page)) => {
                    self.pages.insert(path, page);
                }
                // Deleted since it was listed
                Ok(None) => {}
                Err(e) => warn!(page = %path, error = %e, "Could not load page"),
            }
        }

        info!(provider = Self::NAME, pages = self.pages.len(), "Search provider initialized");
        Ok(())
    }

    async fn find_pages(&self, query: &str) -> ProviderResult<Vec<SearchResult>> {
        let Some(matcher) = ContentMatcher::new(query)? else {
            return Ok(Vec::new());
        };

        let mut results: Vec<SearchResult> = self
            .pages
            .iter()
            .filter_map(|entry| {
                let page = entry.value();
                matcher
                    .score(page.name(), &page.content)
                    .map(|score| SearchResult::new(page.clone(), score))
            })
            .collect();

        results.sort_by(rank);
        results.truncate(self.max_results.load(AtomicOrdering::Relaxed));

        debug!(query = query, hits = results.len(), "Basic search completed");
        Ok(results)
    }

    async fn reindex_page(&self, page: &Page) -> ProviderResult<()> {
        self.pages.insert(page.path.clone(), page.clone());
        Ok(())
    }

    async fn page_removed(&self, page: &Page) -> ProviderResult<()> {
        self.pages.remove(&page.path);
        Ok(())
    }
}
