use crate::error::{AppError, Result};
use crate::events::{PageEventBridge, WikiEvent};
use crate::models::{Page, PagePath};
use crate::state::{PageStore, PathLocks};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Extension of page files picked up by [`InMemoryPageStore::load_dir`]
pub const PAGE_FILE_EXTENSION: &str = "txt";

/// In-memory page store (for the CLI and testing)
///
/// Mutations made through [`save_page`](Self::save_page) and
/// [`delete_page`](Self::delete_page) are announced on the attached event
/// bridge, the same way a real wiki content manager would. Mutations of one
/// page are serialized together with their events, so listeners see the
/// changes of a page in the order they were made.
#[derive(Clone)]
pub struct InMemoryPageStore {
    pages: Arc<DashMap<PagePath, Page>>,
    writes: Arc<PathLocks>,
    events: Option<Arc<PageEventBridge>>,
}

impl InMemoryPageStore {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(DashMap::new()),
            writes: Arc::new(PathLocks::new()),
            events: None,
        }
    }

    /// Create a store that publishes lifecycle events on `events`
    pub fn with_events(events: Arc<PageEventBridge>) -> Self {
        Self {
            pages: Arc::new(DashMap::new()),
            writes: Arc::new(PathLocks::new()),
            events: Some(events),
        }
    }

    /// Save new content for a page, bumping its version
    pub async fn save_page(
        &self,
        path: impl Into<PagePath>,
        content: impl Into<String>,
        author: Option<&str>,
    ) -> Result<Page> {
        let path = path.into();
        if path.as_str().is_empty() {
            return Err(AppError::Validation("page path must not be empty".to_string()));
        }

        let _write = self.writes.lock(&path).await;
        let page = {
            let mut entry = self
                .pages
                .entry(path.clone())
                .or_insert_with(|| Page::new(path.clone(), String::new()).with_version(0));
            let mut next = entry.next_version(content);
            if let Some(author) = author {
                next.author = Some(author.to_string());
            }
            *entry = next.clone();
            next
        };

        tracing::debug!(page = %path, version = page.version, "Page saved");

        if let Some(ref events) = self.events {
            events.publish(WikiEvent::saved(path)).await;
        }

        Ok(page)
    }

    /// Delete a page
    ///
    /// Listeners see `PageDeleteRequested` while the page is still present,
    /// then `PageDeleted` once it is gone.
    pub async fn delete_page(&self, path: &PagePath) -> Result<()> {
        let _write = self.writes.lock(path).await;
        if !self.pages.contains_key(path) {
            return Err(AppError::NotFound(format!("Page {} not found", path)));
        }

        if let Some(ref events) = self.events {
            events.publish(WikiEvent::delete_requested(path.clone())).await;
        }

        self.pages.remove(path);
        tracing::debug!(page = %path, "Page deleted");

        if let Some(ref events) = self.events {
            events.publish(WikiEvent::deleted(path.clone())).await;
        }

        Ok(())
    }

    /// Put a page into the store without notifying anyone
    pub fn import_page(&self, page: Page) {
        self.pages.insert(page.path.clone(), page);
    }

    /// Remove a page from the store without notifying anyone
    pub fn purge_page(&self, path: &PagePath) -> Option<Page> {
        self.pages.remove(path).map(|(_, page)| page)
    }

    /// Import every `*.txt` file of a directory as a page named after the file
    pub async fn load_dir(&self, dir: &Path) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut loaded = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PAGE_FILE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let content = tokio::fs::read_to_string(&path).await?;
            self.import_page(Page::new(name, content));
            loaded += 1;
        }

        tracing::info!(dir = %dir.display(), pages = loaded, "Loaded pages from directory");
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Default for InMemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageStore for InMemoryPageStore {
    async fn get_page(&self, path: &PagePath) -> Result<Option<Page>> {
        Ok(self.pages.get(path).map(|entry| entry.clone()))
    }

    async fn find_all_page_names(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .pages
            .iter()
            .map(|entry| entry.key().as_str().to_string())
            .collect())
    }
}
