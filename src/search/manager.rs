//! Search manager
//!
//! Owns the active [`SearchProvider`], keeps its index in step with the page
//! store by listening to page events, and exposes the query and suggestion
//! surface to the rest of the wiki.
//!
//! # Consistency protocol
//!
//! Every event is handled by fetching the page from the store again, so the
//! state the index ends up with is whatever the store held last. Fetch and
//! index update for one page run under a per-page lock; the update applied
//! last always belongs to the fetch made last.
//!
//! - `PageDeleteRequested`: the page is dropped from the index. If the store
//!   no longer has the page the handler still drops it, then reports
//!   [`SearchError::InternalInconsistency`].
//! - `PageSaved`: the page is reindexed. A page that vanished before the
//!   handler ran is skipped.
//! - anything else is ignored.
//!
//! Provider failures on this path are logged and swallowed so one bad page
//! never stops the event flow.

use crate::error::AppError;
use crate::events::{ListenerId, PageEventBridge, WikiEvent, WikiEventListener};
use crate::models::{Page, PagePath};
use crate::rpc::RpcRegistry;
use crate::search::basic::BasicSearchProvider;
use crate::search::config::{is_positive, SearchConfig};
use crate::search::error::{ProviderResult, SearchError};
use crate::search::json::{JsonSearch, TransportHit, JSON_SEARCH};
use crate::search::naming::{clean_link, wikify_link};
use crate::search::provider::{SearchProvider, SearchResult};
use crate::search::registry::{BuiltinProvider, ProviderRegistry};
use crate::state::{PageStore, PathLocks};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Search manager
pub struct SearchManager {
    store: Arc<dyn PageStore>,
    events: Arc<PageEventBridge>,
    rpc: Arc<RpcRegistry>,
    config: SearchConfig,
    listener: Mutex<Option<ListenerId>>,
    /// Holds the provider once initialization has completed
    ready: watch::Sender<Option<Arc<dyn SearchProvider>>>,
    page_locks: PathLocks,
    shut_down: AtomicBool,
}

impl SearchManager {
    /// Start a search manager with the built-in providers
    pub async fn initialize(
        config: SearchConfig,
        store: Arc<dyn PageStore>,
        events: Arc<PageEventBridge>,
        rpc: Arc<RpcRegistry>,
    ) -> Arc<Self> {
        Self::initialize_with_registry(config, store, events, rpc, &ProviderRegistry::builtin())
            .await
    }

    /// Start a search manager, picking its provider from `registry`.
    ///
    /// Never fails: a provider that cannot be built or set up is replaced by
    /// the basic provider, and remaining setup errors are logged.
    pub async fn initialize_with_registry(
        config: SearchConfig,
        store: Arc<dyn PageStore>,
        events: Arc<PageEventBridge>,
        rpc: Arc<RpcRegistry>,
        registry: &ProviderRegistry,
    ) -> Arc<Self> {
        let (ready, _) = watch::channel(None);
        let manager = Arc::new(Self {
            store,
            events,
            rpc,
            config,
            listener: Mutex::new(None),
            ready,
            page_locks: PathLocks::new(),
            shut_down: AtomicBool::new(false),
        });

        let name = select_provider_name(&manager.config);

        let listener = Arc::new(SearchEventListener {
            manager: Arc::downgrade(&manager),
        });
        *manager.listener.lock() = Some(manager.events.add_listener(listener));

        manager.rpc.register_global_object(
            JSON_SEARCH,
            Arc::new(JsonSearch::new(Arc::downgrade(&manager))),
        );

        let provider = manager.start_provider(registry, &name).await;
        info!(provider = provider.name(), "Search manager initialized");
        manager.ready.send_replace(Some(provider));

        manager
    }

    async fn start_provider(
        &self,
        registry: &ProviderRegistry,
        name: &str,
    ) -> Arc<dyn SearchProvider> {
        let provider = registry.create_or_fallback(name);

        match provider.initialize(Arc::clone(&self.store), &self.config).await {
            Ok(()) => provider,
            Err(e) if e.is_initialization() && provider.name() != BasicSearchProvider::NAME => {
                warn!(
                    provider = provider.name(),
                    error = %e,
                    "Search provider failed to start, using basic search"
                );
                let basic = BuiltinProvider::Basic.create();
                if let Err(e) = basic.initialize(Arc::clone(&self.store), &self.config).await {
                    error!(provider = basic.name(), error = %e, "Search provider initialization failed");
                }
                basic
            }
            Err(e) => {
                error!(
                    provider = provider.name(),
                    error_code = e.error_code(),
                    error = %e,
                    "Search provider initialization failed"
                );
                provider
            }
        }
    }

    /// The active provider, once initialization has completed
    async fn provider(&self) -> ProviderResult<Arc<dyn SearchProvider>> {
        let not_ready = || SearchError::SearchFailed("search manager is not initialized".to_string());

        let mut rx = self.ready.subscribe();
        let provider = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| not_ready())?
            .as_ref()
            .map(Arc::clone);
        provider.ok_or_else(not_ready)
    }

    /// Name of the active provider
    pub fn provider_name(&self) -> Option<&'static str> {
        self.ready.borrow().as_ref().map(|p| p.name())
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run a query in the active provider's syntax; `None` is an empty query
    pub async fn find_pages(&self, query: Option<&str>) -> ProviderResult<Vec<SearchResult>> {
        self.provider().await?.find_pages(query.unwrap_or("")).await
    }

    /// Run a query, skipping the first `offset` hits
    pub async fn find_pages_with_offset(
        &self,
        query: &str,
        offset: usize,
    ) -> ProviderResult<Vec<SearchResult>> {
        self.provider()
            .await?
            .find_pages_with_offset(query, offset)
            .await
    }

    /// Reindex a page right away
    pub async fn reindex_page(&self, page: &Page) -> ProviderResult<()> {
        self.provider().await?.reindex_page(page).await
    }

    /// Page names matching `fragment`, in the store's name order, at most
    /// `max_length` of them.
    ///
    /// A name matches when it starts (case-insensitively) with either the
    /// cleaned or the legacy CamelCase form of the fragment. An attachment
    /// suffix (`/file`) on the fragment is kept as given.
    pub async fn get_suggestions(&self, fragment: &str, max_length: usize) -> Vec<String> {
        let start = Instant::now();
        let mut suggestions = Vec::new();

        if fragment.trim().is_empty() || max_length == 0 {
            return suggestions;
        }

        let (name, filename) = match fragment.find('/') {
            Some(pos) => (&fragment[..pos], fragment[pos..].to_lowercase()),
            None => (fragment, String::new()),
        };
        let clean_name = clean_link(name).to_lowercase() + &filename;
        let legacy_name = wikify_link(name).to_lowercase() + &filename;

        if let Err(e) = self.provider().await {
            warn!(error = %e, "Search manager is not ready for suggestions");
            return suggestions;
        }
        let names = match self.store.find_all_page_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Could not list pages for suggestions");
                Default::default()
            }
        };

        for page_name in names {
            let lower = page_name.to_lowercase();
            if lower.starts_with(&clean_name) || lower.starts_with(&legacy_name) {
                suggestions.push(page_name);
                if suggestions.len() >= max_length {
                    break;
                }
            }
        }

        debug!(
            fragment = fragment,
            suggestions = suggestions.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Suggestions computed"
        );
        suggestions
    }

    /// Search results shaped for transport, at most `max_length` of them.
    ///
    /// Never fails; an error yields what was collected before it.
    pub async fn find_pages_for_transport(&self, query: &str, max_length: usize) -> Vec<TransportHit> {
        let start = Instant::now();
        let mut hits = Vec::new();

        if query.trim().is_empty() || max_length == 0 {
            return hits;
        }

        let results = match self.provider().await {
            Ok(provider) => provider.find_pages_with_limit(query, 0, max_length).await,
            Err(e) => Err(e),
        };
        match results {
            Ok(results) => {
                hits.extend(results.into_iter().take(max_length).map(TransportHit::from));
            }
            Err(e) => {
                info!(query = query, error = %e, "Search for transport failed");
            }
        }

        debug!(
            query = query,
            hits = hits.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Transport search completed"
        );
        hits
    }

    /// Apply one page event to the index
    pub async fn action_performed(&self, event: &WikiEvent) -> ProviderResult<()> {
        let provider = self.provider().await?;

        match event {
            WikiEvent::PageDeleteRequested { path } => {
                let _page = self.page_locks.lock(path).await;
                match self.fetch(path).await? {
                    Some(page) => {
                        if let Err(e) = provider.page_removed(&page).await {
                            error!(page = %path, error = %e, "Failed to remove page from index");
                        }
                        Ok(())
                    }
                    None => {
                        // The store has nothing, so neither may the index
                        let gone = Page::new(path.clone(), String::new());
                        if let Err(e) = provider.page_removed(&gone).await {
                            error!(page = %path, error = %e, "Failed to remove page from index");
                        }
                        Err(SearchError::InternalInconsistency(format!(
                            "page {} is being deleted but the store does not have it",
                            path
                        )))
                    }
                }
            }
            WikiEvent::PageSaved { path } => {
                let _page = self.page_locks.lock(path).await;
                match self.fetch(path).await? {
                    Some(page) => {
                        if let Err(e) = provider.reindex_page(&page).await {
                            error!(page = %path, error = %e, "Failed to reindex page");
                        }
                    }
                    None => debug!(page = %path, "Saved page is already gone, not indexing"),
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn fetch(&self, path: &PagePath) -> ProviderResult<Option<Page>> {
        self.store
            .get_page(path)
            .await
            .map_err(|e| SearchError::Store(e.to_string()))
    }

    /// Detach from the event bridge and the RPC registry, then close the
    /// provider. Only the first call does anything.
    pub async fn shutdown(&self) -> ProviderResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let listener = self.listener.lock().take();
        if let Some(id) = listener {
            self.events.remove_listener(id);
        }
        self.rpc.unregister(JSON_SEARCH);

        self.provider().await?.close().await?;

        info!("Search manager shut down");
        Ok(())
    }
}

/// Name of the provider to load, honouring the deprecated boolean switch
pub fn select_provider_name(config: &SearchConfig) -> String {
    match config.legacy_full_text_engine.as_deref() {
        Some(value) => {
            warn!(
                value = value,
                "search.legacy_full_text_engine is deprecated, set search.provider instead"
            );
            if is_positive(value) {
                BuiltinProvider::Tantivy.to_string()
            } else {
                BuiltinProvider::Basic.to_string()
            }
        }
        None => config.provider.clone(),
    }
}

/// Bridge listener that forwards to a manager without keeping it alive
struct SearchEventListener {
    manager: Weak<SearchManager>,
}

#[async_trait]
impl WikiEventListener for SearchEventListener {
    async fn action_performed(&self, event: &WikiEvent) -> crate::error::Result<()> {
        match self.manager.upgrade() {
            Some(manager) => manager.action_performed(event).await.map_err(AppError::from),
            None => Ok(()),
        }
    }
}
