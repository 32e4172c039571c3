//! Search index management

use crate::search::config::SearchConfig;
use crate::search::document::{build_page_schema, PageDocument, PageFields, SearchDocument};
use crate::search::error::{ProviderResult, SearchError};
use chrono::{DateTime, Utc};
use parking_lot::RwLock as SyncRwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::Query;
use tantivy::schema::{Schema, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;
use tracing::debug;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of documents in the index
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,

    /// Last commit timestamp
    pub last_commit: Option<DateTime<Utc>>,
}

/// A document found by [`IndexManager::search`]
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    /// Page path the document was indexed under
    pub id: String,
    pub score: f32,
    /// Page version at indexing time
    pub version: Option<u64>,
}

/// Manages the Tantivy search index
pub struct IndexManager {
    /// The Tantivy index
    index: Index,

    /// The schema
    schema: Schema,

    fields: PageFields,

    /// Index writer; one writer at a time
    writer: RwLock<IndexWriter>,

    /// Index reader, reloaded after every commit
    reader: IndexReader,

    index_path: PathBuf,

    /// Commit after every update
    realtime: bool,

    /// Updates written but not yet committed
    dirty: AtomicBool,

    last_commit: SyncRwLock<Option<DateTime<Utc>>>,
}

impl IndexManager {
    /// Open the index at `config.index_path`, creating it if needed
    pub async fn open(config: &SearchConfig) -> ProviderResult<Self> {
        config.validate()?;

        // Create index directory if it doesn't exist
        std::fs::create_dir_all(&config.index_path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;

        let index = if Self::index_exists(&config.index_path) {
            Index::open_in_dir(&config.index_path).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
            })?
        } else {
            Index::create_in_dir(&config.index_path, build_page_schema()).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
            })?
        };

        let schema = index.schema();
        // An index written by something else is unusable
        let fields = PageFields::new(&schema)
            .map_err(|e| SearchError::IndexCorruption(format!("Unexpected schema: {}", e)))?;

        let writer = index
            .writer_with_num_threads(config.indexing_threads, config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        debug!(path = %config.index_path.display(), "Search index opened");

        Ok(Self {
            index,
            schema,
            fields,
            writer: RwLock::new(writer),
            reader,
            index_path: config.index_path.clone(),
            realtime: config.realtime_indexing,
            dirty: AtomicBool::new(false),
            last_commit: SyncRwLock::new(None),
        })
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    /// Get the schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the index
    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn fields(&self) -> &PageFields {
        &self.fields
    }

    /// Index a single page document, replacing any earlier version
    pub async fn index_document(&self, document: &PageDocument) -> ProviderResult<()> {
        let tantivy_doc = document.to_tantivy_doc(&self.fields);

        let mut writer = self.writer.write().await;

        // Delete existing document with same ID first
        writer.delete_term(Term::from_field_text(self.fields.id, document.document_id()));

        writer
            .add_document(tantivy_doc)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to add document: {}", e)))?;

        if self.realtime {
            self.commit_locked(&mut writer)
                .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit document: {}", e)))?;
        } else {
            self.dirty.store(true, Ordering::Release);
        }

        Ok(())
    }

    /// Index multiple page documents with a single commit
    pub async fn index_documents(&self, documents: &[PageDocument]) -> ProviderResult<usize> {
        let mut writer = self.writer.write().await;
        let mut indexed = 0;

        for document in documents {
            writer.delete_term(Term::from_field_text(self.fields.id, document.document_id()));
            writer
                .add_document(document.to_tantivy_doc(&self.fields))
                .map_err(|e| {
                    SearchError::IndexingFailed(format!(
                        "Failed to add document {}: {}",
                        document.document_id(),
                        e
                    ))
                })?;
            indexed += 1;
        }

        self.commit_locked(&mut writer)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit batch: {}", e)))?;

        Ok(indexed)
    }

    /// Delete a document by ID; deleting an unknown ID is not an error
    pub async fn delete_document(&self, document_id: &str) -> ProviderResult<()> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.id, document_id));

        if self.realtime {
            self.commit_locked(&mut writer).map_err(|e| {
                SearchError::DeletionFailed(format!("Failed to commit deletion: {}", e))
            })?;
        } else {
            self.dirty.store(true, Ordering::Release);
        }

        Ok(())
    }

    /// Commit pending changes
    pub async fn commit(&self) -> ProviderResult<()> {
        let mut writer = self.writer.write().await;
        self.commit_locked(&mut writer)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))
    }

    /// Commit only if updates are waiting; returns whether it committed
    pub async fn commit_if_dirty(&self) -> ProviderResult<bool> {
        if !self.has_pending_changes() {
            return Ok(false);
        }
        self.commit().await?;
        Ok(true)
    }

    /// Whether updates are waiting for a commit
    pub fn has_pending_changes(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clear the entire index
    pub async fn clear_index(&self) -> ProviderResult<()> {
        let mut writer = self.writer.write().await;
        writer
            .delete_all_documents()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to clear index: {}", e)))?;
        self.commit_locked(&mut writer)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit clear: {}", e)))
    }

    fn commit_locked(&self, writer: &mut IndexWriter) -> tantivy::Result<()> {
        self.dirty.store(false, Ordering::Release);
        if let Err(e) = writer.commit() {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        self.reader.reload()?;
        *self.last_commit.write() = Some(Utc::now());
        Ok(())
    }

    /// Run a query and return the hits ranked by score
    pub fn search(
        &self,
        query: &dyn Query,
        limit: usize,
        offset: usize,
    ) -> ProviderResult<Vec<IndexHit>> {
        let searcher = self.reader.searcher();
        let collector = TopDocs::with_limit(limit.max(1)).and_offset(offset);

        let top_docs = searcher
            .search(query, &collector)
            .map_err(|e| SearchError::SearchFailed(e.to_string()))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) else {
                return Err(SearchError::IndexCorruption(format!(
                    "Document {:?} has no id",
                    address
                )));
            };
            hits.push(IndexHit {
                id: id.to_string(),
                score,
                version: doc.get_first(self.fields.version).and_then(|v| v.as_u64()),
            });
        }

        Ok(hits)
    }

    /// Number of live documents visible to readers
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Get index statistics
    pub async fn get_stats(&self) -> ProviderResult<IndexStats> {
        let searcher = self.reader.searcher();

        let total_documents = searcher
            .search(&tantivy::query::AllQuery, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to count documents: {}", e)))?
            as u64;

        let num_segments = searcher.segment_readers().len();

        // Calculate approximate index size
        let index_size_bytes = std::fs::read_dir(&self.index_path)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        Ok(IndexStats {
            total_documents,
            index_size_bytes,
            num_segments,
            last_commit: *self.last_commit.read(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;
    use crate::search::config::SearchConfigBuilder;
    use tantivy::query::AllQuery;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> SearchConfig {
        SearchConfigBuilder::new()
            .index_path(dir.path().to_path_buf())
            .build()
    }

    #[tokio::test]
    async fn test_index_creation() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(&config(&temp_dir)).await;
        assert!(manager.is_ok());
        assert!(temp_dir.path().join("meta.json").exists());
    }

    #[tokio::test]
    async fn test_index_stats() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(&config(&temp_dir)).await.unwrap();
        let stats = manager.get_stats().await.unwrap();

        assert_eq!(stats.total_documents, 0);
        assert!(stats.last_commit.is_none());
    }

    #[tokio::test]
    async fn test_reindex_replaces_document() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(&config(&temp_dir)).await.unwrap();

        let page = Page::new("Main", "first");
        manager.index_document(&PageDocument::from(&page)).await.unwrap();
        let page = page.next_version("second");
        manager.index_document(&PageDocument::from(&page)).await.unwrap();

        let hits = manager.search(&AllQuery, 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "Main");
        assert_eq!(hits[0].version, Some(2));
    }

    #[tokio::test]
    async fn test_delete_unknown_document() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(&config(&temp_dir)).await.unwrap();

        assert!(manager.delete_document("Nope").await.is_ok());
        assert_eq!(manager.num_docs(), 0);
    }

    #[tokio::test]
    async fn test_batch_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(&config(&temp_dir)).await.unwrap();

        let docs: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|name| PageDocument::from(&Page::new(*name, "text")))
            .collect();
        assert_eq!(manager.index_documents(&docs).await.unwrap(), 3);
        assert_eq!(manager.num_docs(), 3);

        manager.clear_index().await.unwrap();
        assert_eq!(manager.num_docs(), 0);
    }

    #[tokio::test]
    async fn test_reopen_existing_index() {
        let temp_dir = TempDir::new().unwrap();
        {
            let manager = IndexManager::open(&config(&temp_dir)).await.unwrap();
            manager
                .index_document(&PageDocument::from(&Page::new("Kept", "persisted")))
                .await
                .unwrap();
        }

        let manager = IndexManager::open(&config(&temp_dir)).await.unwrap();
        assert_eq!(manager.num_docs(), 1);
    }

    #[tokio::test]
    async fn test_deferred_commit() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchConfigBuilder::new()
            .index_path(temp_dir.path().to_path_buf())
            .realtime_indexing(false)
            .build();
        let manager = IndexManager::open(&config).await.unwrap();
        assert!(!manager.commit_if_dirty().await.unwrap());

        manager
            .index_document(&PageDocument::from(&Page::new("Later", "pending")))
            .await
            .unwrap();
        assert!(manager.has_pending_changes());
        assert_eq!(manager.num_docs(), 0);

        assert!(manager.commit_if_dirty().await.unwrap());
        assert!(!manager.has_pending_changes());
        assert_eq!(manager.num_docs(), 1);

        manager.delete_document("Later").await.unwrap();
        assert_eq!(manager.num_docs(), 1);
        assert!(manager.commit_if_dirty().await.unwrap());
        assert_eq!(manager.num_docs(), 0);
    }
}
