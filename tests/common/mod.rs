//! Common test utilities for search integration tests
//!
//! Helpers to stand up a page store, an event bridge, an RPC registry and a
//! search manager over a temporary index directory.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;
use wiki_search::error::{AppError, Result};
use wiki_search::events::PageEventBridge;
use wiki_search::models::{Page, PagePath};
use wiki_search::rpc::RpcRegistry;
use wiki_search::search::{
    ProviderRegistry, ProviderResult, SearchConfig, SearchConfigBuilder, SearchError,
    SearchManager, SearchProvider, SearchResult,
};
use wiki_search::state::{InMemoryPageStore, PageStore};

/// Search config for `provider` with its index under `dir`
pub fn test_config(dir: &TempDir, provider: &str) -> SearchConfig {
    SearchConfigBuilder::new()
        .provider(provider)
        .index_path(dir.path().join("index"))
        .build()
}

/// A running search manager wired to an in-memory wiki
pub struct TestWiki {
    pub events: Arc<PageEventBridge>,
    pub store: Arc<InMemoryPageStore>,
    pub rpc: Arc<RpcRegistry>,
    pub manager: Arc<SearchManager>,
    // Keeps the index directory alive for the duration of the test
    _dir: TempDir,
}

impl TestWiki {
    /// Start a wiki with an empty store
    pub async fn start(provider: &str) -> Self {
        Self::start_with(provider, &ProviderRegistry::builtin(), &[]).await
    }

    /// Start a wiki whose store already holds `pages` (name, text)
    pub async fn with_pages(provider: &str, pages: &[(&str, &str)]) -> Self {
        Self::start_with(provider, &ProviderRegistry::builtin(), pages).await
    }

    pub async fn start_with(
        provider: &str,
        registry: &ProviderRegistry,
        pages: &[(&str, &str)],
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let events = Arc::new(PageEventBridge::default());
        let store = Arc::new(InMemoryPageStore::with_events(events.clone()));
        for (name, text) in pages {
            store.import_page(Page::new(*name, *text));
        }
        let rpc = Arc::new(RpcRegistry::new());

        let manager = SearchManager::initialize_with_registry(
            test_config(&dir, provider),
            store.clone(),
            events.clone(),
            rpc.clone(),
            registry,
        )
        .await;

        Self {
            events,
            store,
            rpc,
            manager,
            _dir: dir,
        }
    }

    /// Names of the pages a query finds, in rank order
    pub async fn names_for(&self, query: &str) -> Vec<String> {
        self.manager
            .find_pages(Some(query))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.page().name().to_string())
            .collect()
    }
}

/// A page store that cannot answer anything
pub struct FailingStore;

#[async_trait]
impl PageStore for FailingStore {
    async fn get_page(&self, _path: &PagePath) -> Result<Option<Page>> {
        Err(AppError::Store("backend offline".to_string()))
    }

    async fn find_all_page_names(&self) -> Result<BTreeSet<String>> {
        Err(AppError::Store("backend offline".to_string()))
    }
}

/// Signals for one parked page lookup
#[derive(Default)]
pub struct Gate {
    /// Notified once the lookup has read the store
    pub fetched: Notify,
    /// Lets the lookup return
    pub release: Notify,
}

/// A page store that can park one lookup after it has read the page
pub struct GatedStore {
    pub pages: Arc<InMemoryPageStore>,
    gate: Mutex<Option<(PagePath, Arc<Gate>)>>,
}

impl GatedStore {
    pub fn new(pages: Arc<InMemoryPageStore>) -> Self {
        Self {
            pages,
            gate: Mutex::new(None),
        }
    }

    /// Park the next lookup of `path` until the returned gate is released
    pub fn hold_next_fetch(&self, path: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.gate.lock() = Some((PagePath::new(path), gate.clone()));
        gate
    }
}

#[async_trait]
impl PageStore for GatedStore {
    async fn get_page(&self, path: &PagePath) -> Result<Option<Page>> {
        let page = self.pages.get_page(path).await?;

        let gate = {
            let mut held = self.gate.lock();
            match held.as_ref() {
                Some((gated, _)) if gated == path => held.take().map(|(_, gate)| gate),
                _ => None,
            }
        };
        if let Some(gate) = gate {
            gate.fetched.notify_one();
            gate.release.notified().await;
        }

        Ok(page)
    }

    async fn find_all_page_names(&self) -> Result<BTreeSet<String>> {
        self.pages.find_all_page_names().await
    }
}

/// What a [`ScriptedProvider`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Reindex(String),
    Remove(String),
}

/// A provider that records its calls and fails where told to
#[derive(Default)]
pub struct ScriptedProvider {
    pub calls: Mutex<Vec<ProviderCall>>,
    pub fail_initialize: bool,
    pub fail_updates: bool,
    pub fail_queries: bool,
    /// When set, `initialize` waits for a notification
    pub init_gate: Option<Arc<Notify>>,
    /// Limit passed to the last capped query
    pub last_limit: Mutex<Option<usize>>,
}

impl ScriptedProvider {
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn initialize(
        &self,
        _store: Arc<dyn PageStore>,
        _config: &SearchConfig,
    ) -> ProviderResult<()> {
        if let Some(gate) = &self.init_gate {
            gate.notified().await;
        }
        if self.fail_initialize {
            return Err(SearchError::IndexInitFailed("disk on fire".to_string()));
        }
        Ok(())
    }

    async fn find_pages(&self, _query: &str) -> ProviderResult<Vec<SearchResult>> {
        if self.fail_queries {
            return Err(SearchError::SearchFailed("index unreadable".to_string()));
        }
        Ok(Vec::new())
    }

    async fn find_pages_with_limit(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> ProviderResult<Vec<SearchResult>> {
        *self.last_limit.lock() = Some(limit);
        self.find_pages_with_offset(query, offset).await
    }

    async fn reindex_page(&self, page: &Page) -> ProviderResult<()> {
        self.calls
            .lock()
            .push(ProviderCall::Reindex(page.name().to_string()));
        if self.fail_updates {
            return Err(SearchError::IndexingFailed("write failed".to_string()));
        }
        Ok(())
    }

    async fn page_removed(&self, page: &Page) -> ProviderResult<()> {
        self.calls
            .lock()
            .push(ProviderCall::Remove(page.name().to_string()));
        if self.fail_updates {
            return Err(SearchError::DeletionFailed("write failed".to_string()));
        }
        Ok(())
    }
}

/// A registry serving `provider` under the name "scripted"
pub fn scripted_registry(provider: Arc<ScriptedProvider>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::builtin();
    registry.register("scripted", move || {
        Ok(provider.clone() as Arc<dyn SearchProvider>)
    });
    registry
}
