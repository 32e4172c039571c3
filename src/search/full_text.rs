//! Full-text search provider backed by a tantivy index on disk

use crate::models::{Page, PagePath};
use crate::search::config::SearchConfig;
use crate::search::document::PageDocument;
use crate::search::error::{ProviderResult, SearchError};
use crate::search::index::{IndexManager, IndexStats};
use crate::search::provider::{SearchProvider, SearchResult};
use crate::search::query::QueryBuilder;
use crate::state::PageStore;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Ready {
    index: Arc<IndexManager>,
    queries: QueryBuilder,
    store: Arc<dyn PageStore>,
    max_results: usize,
    /// Periodic commit task, only without realtime indexing
    committer: Option<JoinHandle<()>>,
}

impl Drop for Ready {
    fn drop(&mut self) {
        if let Some(committer) = &self.committer {
            committer.abort();
        }
    }
}

/// Commit pending updates every `every` until the index is dropped
fn spawn_committer(index: Weak<IndexManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(index) = index.upgrade() else {
                break;
            };
            match index.commit_if_dirty().await {
                Ok(true) => debug!("Pending index updates committed"),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Periodic index commit failed"),
            }
        }
    })
}

/// Tantivy-backed provider
///
/// Pages are indexed under their full path. The page body is not stored in
/// the index; hits are resolved against the page store, and hits whose page
/// has disappeared are dropped from the results and from the index.
///
/// Without realtime indexing, updates become visible at the next periodic
/// commit, at most `commit_interval_ms` later.
pub struct TantivySearchProvider {
    ready: OnceCell<Ready>,
}

impl TantivySearchProvider {
    pub const NAME: &'static str = "tantivy";

    pub fn new() -> Self {
        Self {
            ready: OnceCell::new(),
        }
    }

    fn ready(&self) -> ProviderResult<&Ready> {
        self.ready
            .get()
            .ok_or_else(|| SearchError::SearchFailed("search index is not initialized".to_string()))
    }

    /// Statistics of the underlying index
    pub async fn index_stats(&self) -> ProviderResult<IndexStats> {
        self.ready()?.index.get_stats().await
    }

    /// Rebuild the index from every page in the store
    pub async fn full_reindex(&self) -> ProviderResult<usize> {
        let ready = self.ready()?;
        let start = Instant::now();

        let names = ready
            .store
            .find_all_page_names()
            .await
            .map_err(|e| SearchError::Store(e.to_string()))?;

        let pages = try_join_all(names.into_iter().map(|name| {
            let store = Arc::clone(&ready.store);
            async move { store.get_page(&PagePath::new(name)).await }
        }))
        .await
        .map_err(|e| SearchError::Store(e.to_string()))?;

        let documents: Vec<PageDocument> = pages.iter().flatten().map(PageDocument::from).collect();

        ready.index.clear_index().await?;
        let indexed = ready.index.index_documents(&documents).await?;

        info!(
            pages = indexed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Full reindex completed"
        );
        Ok(indexed)
    }
}

impl Default for TantivySearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for TantivySearchProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn initialize(
        &self,
        store: Arc<dyn PageStore>,
        config: &SearchConfig,
    ) -> ProviderResult<()> {
        if self.ready.initialized() {
            return Ok(());
        }

        let ready = self
            .ready
            .get_or_try_init(|| async move {
                let index = Arc::new(IndexManager::open(config).await?);
                let fields = *index.fields();
                let queries = QueryBuilder::new(index.index(), fields.name, fields.contents);
                let committer = (!config.realtime_indexing).then(|| {
                    spawn_committer(
                        Arc::downgrade(&index),
                        Duration::from_millis(config.commit_interval_ms),
                    )
                });
                Ok::<_, SearchError>(Ready {
                    index,
                    queries,
                    store,
                    max_results: config.max_results,
                    committer,
                })
            })
            .await?;

        let documents = ready.index.num_docs();
        info!(
            provider = Self::NAME,
            path = %config.index_path.display(),
            documents = documents,
            "Search provider initialized"
        );

        if documents == 0 && config.reindex_on_startup {
            // The index stays usable even if the store cannot be read now
            if let Err(e) = self.full_reindex().await {
                warn!(error = %e, "Initial reindex failed");
            }
        }

        Ok(())
    }

    async fn find_pages(&self, query: &str) -> ProviderResult<Vec<SearchResult>> {
        self.find_pages_with_offset(query, 0).await
    }

    async fn find_pages_with_offset(
        &self,
        query: &str,
        offset: usize,
    ) -> ProviderResult<Vec<SearchResult>> {
        let limit = self.ready()?.max_results;
        self.find_pages_with_limit(query, offset, limit).await
    }

    async fn find_pages_with_limit(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> ProviderResult<Vec<SearchResult>> {
        let ready = self.ready()?;
        let limit = limit.min(ready.max_results);
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let parsed = ready.queries.build(query)?;
        let hits = ready.index.search(parsed.as_ref(), limit, offset)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let path = PagePath::new(hit.id);
            let page = ready
                .store
                .get_page(&path)
                .await
                .map_err(|e| SearchError::Store(e.to_string()))?;

            match page {
                Some(page) => results.push(SearchResult::new(page, hit.score)),
                None => {
                    debug!(page = %path, "Indexed page no longer exists, removing it");
                    if let Err(e) = ready.index.delete_document(path.as_str()).await {
                        warn!(page = %path, error = %e, "Could not remove stale page");
                    }
                }
            }
        }

        debug!(query = query, offset = offset, hits = results.len(), "Full-text search completed");
        Ok(results)
    }

    async fn reindex_page(&self, page: &Page) -> ProviderResult<()> {
        let ready = self.ready()?;
        ready.index.index_document(&PageDocument::from(page)).await?;
        debug!(page = %page.path, version = page.version, "Page reindexed");
        Ok(())
    }

    async fn page_removed(&self, page: &Page) -> ProviderResult<()> {
        let ready = self.ready()?;
        ready.index.delete_document(page.path.as_str()).await?;
        debug!(page = %page.path, "Page removed from index");
        Ok(())
    }

    async fn close(&self) -> ProviderResult<()> {
        if let Some(ready) = self.ready.get() {
            ready.index.commit().await?;
            debug!(provider = Self::NAME, "Search index closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::SearchConfigBuilder;
    use crate::state::InMemoryPageStore;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    async fn provider_with(store: InMemoryPageStore, dir: &TempDir) -> TantivySearchProvider {
        let config = SearchConfigBuilder::new()
            .index_path(dir.path().to_path_buf())
            .build();
        let provider = TantivySearchProvider::new();
        provider.initialize(Arc::new(store), &config).await.unwrap();
        provider
    }

    #[tokio::test]
    async fn test_startup_reindex() {
        let dir = TempDir::new().unwrap();
        let store = InMemoryPageStore::new();
        store.import_page(Page::new("HelloPage", "hello world"));
        store.import_page(Page::new("Other", "unrelated"));

        let provider = provider_with(store, &dir).await;
        assert_eq!(provider.index_stats().await.unwrap().total_documents, 2);

        let results = provider.find_pages("hello world").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page().name(), "HelloPage");
    }

    #[tokio::test]
    async fn test_not_initialized() {
        let provider = TantivySearchProvider::new();
        let err = provider.find_pages("anything").await.unwrap_err();
        assert_eq!(err.error_code(), "SEARCH_FAILED");
        assert!(provider.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_hits_are_dropped() {
        let dir = TempDir::new().unwrap();
        let store = InMemoryPageStore::new();
        let page = Page::new("Gone", "ephemeral words");
        store.import_page(page.clone());

        let provider = provider_with(store.clone(), &dir).await;
        store.purge_page(&page.path);

        assert!(provider.find_pages("ephemeral").await.unwrap().is_empty());
        assert_eq!(provider.index_stats().await.unwrap().total_documents, 0);
    }

    #[tokio::test]
    async fn test_offset_and_name_search() {
        let dir = TempDir::new().unwrap();
        let store = InMemoryPageStore::new();
        for name in ["ReleaseNotes", "ReleasePlan", "Unrelated"] {
            store.import_page(Page::new(name, "text"));
        }

        let provider = provider_with(store, &dir).await;
        let all = provider.find_pages("release").await.unwrap();
        assert_eq!(all.len(), 2);

        let rest = provider.find_pages_with_offset("release", 1).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].page().name(), all[1].page().name());
    }

    #[tokio::test]
    async fn test_invalid_query() {
        let dir = TempDir::new().unwrap();
        let provider = provider_with(InMemoryPageStore::new(), &dir).await;

        let err = provider.find_pages("nosuchfield:value").await.unwrap_err();
        assert_eq!(err.error_code(), "QUERY_PARSING_FAILED");
    }

    /// Store wrapper counting page lookups
    struct CountingStore {
        inner: InMemoryPageStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl PageStore for CountingStore {
        async fn get_page(&self, path: &PagePath) -> crate::error::Result<Option<Page>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.get_page(path).await
        }

        async fn find_all_page_names(&self) -> crate::error::Result<BTreeSet<String>> {
            self.inner.find_all_page_names().await
        }
    }

    #[tokio::test]
    async fn test_limit_stops_resolving_hits() {
        let dir = TempDir::new().unwrap();
        let inner = InMemoryPageStore::new();
        for i in 0..10 {
            inner.import_page(Page::new(format!("Page{}", i), "common words"));
        }
        let store = Arc::new(CountingStore {
            inner,
            lookups: AtomicUsize::new(0),
        });

        let provider = TantivySearchProvider::new();
        let config = SearchConfigBuilder::new()
            .index_path(dir.path().to_path_buf())
            .build();
        provider.initialize(store.clone(), &config).await.unwrap();
        store.lookups.store(0, Ordering::SeqCst);

        let results = provider.find_pages_with_limit("common", 0, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);

        assert!(provider.find_pages_with_limit("common", 0, 0).await.unwrap().is_empty());
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_periodic_commit_makes_updates_visible() {
        let dir = TempDir::new().unwrap();
        let store = InMemoryPageStore::new();
        let page = Page::new("HelloPage", "hello world");
        store.import_page(page.clone());

        let config = SearchConfigBuilder::new()
            .index_path(dir.path().to_path_buf())
            .realtime_indexing(false)
            .commit_interval_ms(50)
            .reindex_on_startup(false)
            .build();
        let provider = TantivySearchProvider::new();
        provider.initialize(Arc::new(store), &config).await.unwrap();

        provider.reindex_page(&page).await.unwrap();

        let mut found = Vec::new();
        for _ in 0..100 {
            found = provider.find_pages("hello").await.unwrap();
            if !found.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].page().name(), "HelloPage");
    }
}
