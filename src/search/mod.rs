//! Wiki page search
//!
//! The [`SearchManager`] keeps a pluggable [`SearchProvider`] in step with
//! the page store and answers full-text queries and page-name suggestions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  page events   ┌─────────────────────────────────┐
//! │  Page store  │ ─────────────▶ │          SearchManager          │
//! └──────────────┘                │  - find_pages()                 │
//!        ▲                        │  - get_suggestions()            │
//!        │ get_page()             │  - find_pages_for_transport()   │
//!        └─────────────────────── │  - reindex_page()               │
//!                                 └─────────────────────────────────┘
//!                                        │                  ▲
//!                                        ▼                  │ "search.*"
//!                     ┌──────────────────────────┐   ┌─────────────┐
//!                     │      SearchProvider      │   │ JsonSearch  │
//!                     │  basic   │   tantivy     │   │ (RPC)       │
//!                     └──────────────────────────┘   └─────────────┘
//! ```
//!
//! Providers are chosen by name through the [`ProviderRegistry`]; a name the
//! registry does not know, or a provider that fails to start, falls back to
//! the basic provider.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wiki_search::events::PageEventBridge;
//! use wiki_search::rpc::RpcRegistry;
//! use wiki_search::search::{SearchConfig, SearchManager};
//! use wiki_search::state::InMemoryPageStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let events = Arc::new(PageEventBridge::default());
//!     let store = Arc::new(InMemoryPageStore::with_events(events.clone()));
//!
//!     let search = SearchManager::initialize(
//!         SearchConfig::default(),
//!         store.clone(),
//!         events,
//!         Arc::new(RpcRegistry::new()),
//!     )
//!     .await;
//!
//!     store.save_page("HelloPage", "hello world", None).await?;
//!
//!     let results = search.find_pages(Some("hello world")).await?;
//!     println!("Found {} pages", results.len());
//!
//!     search.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod basic;
mod config;
mod document;
mod error;
mod full_text;
mod index;
mod json;
mod manager;
mod naming;
mod provider;
mod query;
mod registry;

pub use basic::BasicSearchProvider;
pub use config::{is_positive, SearchConfig, SearchConfigBuilder, MIN_WRITER_HEAP_PER_THREAD};
pub use document::{beautify_name, build_page_schema, PageDocument, PageFields, SearchDocument};
pub use error::{ProviderResult, SearchError};
pub use full_text::TantivySearchProvider;
pub use index::{IndexHit, IndexManager, IndexStats};
pub use json::{JsonSearch, TransportHit, DEFAULT_MAX_LENGTH, JSON_SEARCH};
pub use manager::{select_provider_name, SearchManager};
pub use naming::{clean_link, wikify_link, LEGACY_CHARS_ALLOWED, PUNCTUATION_CHARS_ALLOWED};
pub use provider::{SearchProvider, SearchResult};
pub use query::{parse_query, ContentMatcher, QueryBuilder, QueryItem, QueryItemKind, NAME_MATCH_WEIGHT};
pub use registry::{BuiltinProvider, ProviderFactory, ProviderRegistry};
