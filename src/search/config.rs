//! Search configuration

use crate::search::error::SearchError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Smallest writer heap tantivy accepts per indexing thread
pub const MIN_WRITER_HEAP_PER_THREAD: usize = 15_000_000;

/// Search subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the search provider to load (see `ProviderRegistry`)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Deprecated switch for the full-text engine.
    ///
    /// When present it overrides `provider`: a positive value selects the
    /// full-text provider, anything else the basic one.
    #[serde(default)]
    pub legacy_full_text_engine: Option<String>,

    /// Path to the search index directory
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Index writer heap size in bytes (default: 50MB)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Number of threads for indexing
    #[serde(default = "default_indexing_threads")]
    pub indexing_threads: usize,

    /// Commit after every index update
    #[serde(default = "default_true")]
    pub realtime_indexing: bool,

    /// Longest time an update waits for a commit when `realtime_indexing` is off
    #[serde(default = "default_commit_interval_ms")]
    pub commit_interval_ms: u64,

    /// Maximum search results a provider returns for one query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Rebuild the whole index from the page store when it starts out empty
    #[serde(default = "default_true")]
    pub reindex_on_startup: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            legacy_full_text_engine: None,
            index_path: default_index_path(),
            writer_heap_size: default_writer_heap_size(),
            indexing_threads: default_indexing_threads(),
            realtime_indexing: true,
            commit_interval_ms: default_commit_interval_ms(),
            max_results: default_max_results(),
            reindex_on_startup: true,
        }
    }
}

impl SearchConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 {
            return Err(SearchError::InvalidConfiguration(
                "max_results must be greater than 0".to_string(),
            ));
        }

        if self.indexing_threads == 0 {
            return Err(SearchError::InvalidConfiguration(
                "indexing_threads must be greater than 0".to_string(),
            ));
        }

        if !self.realtime_indexing && self.commit_interval_ms == 0 {
            return Err(SearchError::InvalidConfiguration(
                "commit_interval_ms must be greater than 0 without realtime indexing".to_string(),
            ));
        }

        if self.writer_heap_size / self.indexing_threads < MIN_WRITER_HEAP_PER_THREAD {
            return Err(SearchError::InvalidConfiguration(format!(
                "writer_heap_size must allow at least {} bytes per indexing thread",
                MIN_WRITER_HEAP_PER_THREAD
            )));
        }

        Ok(())
    }
}

/// Interpret a loosely written boolean option ("yes", "on", "true", "1")
pub fn is_positive(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.config.provider = name.into();
        self
    }

    pub fn legacy_full_text_engine(mut self, value: impl Into<String>) -> Self {
        self.config.legacy_full_text_engine = Some(value.into());
        self
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = path;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn indexing_threads(mut self, threads: usize) -> Self {
        self.config.indexing_threads = threads;
        self
    }

    pub fn realtime_indexing(mut self, enabled: bool) -> Self {
        self.config.realtime_indexing = enabled;
        self
    }

    pub fn commit_interval_ms(mut self, millis: u64) -> Self {
        self.config.commit_interval_ms = millis;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn reindex_on_startup(mut self, enabled: bool) -> Self {
        self.config.reindex_on_startup = enabled;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Default value functions for serde
fn default_provider() -> String {
    "tantivy".to_string()
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/search_index")
}

fn default_writer_heap_size() -> usize {
    50_000_000
}

fn default_indexing_threads() -> usize {
    1
}

fn default_commit_interval_ms() -> u64 {
    1000
}

fn default_max_results() -> usize {
    1000
}

fn default_true() -> bool {
    true
}
