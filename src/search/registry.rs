//! Search provider registry
//!
//! Providers are looked up by name. The built-in providers answer to their
//! short names and to the class names older wiki configurations used.

use crate::search::basic::BasicSearchProvider;
use crate::search::error::{ProviderResult, SearchError};
use crate::search::full_text::TantivySearchProvider;
use crate::search::provider::SearchProvider;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{info, warn};

/// Builds a provider instance
pub type ProviderFactory = Arc<dyn Fn() -> ProviderResult<Arc<dyn SearchProvider>> + Send + Sync>;

/// Providers shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum BuiltinProvider {
    #[strum(
        to_string = "basic",
        serialize = "BasicSearchProvider",
        serialize = "org.apache.wiki.search.BasicSearchProvider"
    )]
    Basic,
    #[strum(
        to_string = "tantivy",
        serialize = "fulltext",
        serialize = "LuceneSearchProvider",
        serialize = "org.apache.wiki.search.LuceneSearchProvider"
    )]
    Tantivy,
}

impl BuiltinProvider {
    /// Build a fresh instance
    pub fn create(self) -> Arc<dyn SearchProvider> {
        match self {
            BuiltinProvider::Basic => Arc::new(BasicSearchProvider::new()),
            BuiltinProvider::Tantivy => Arc::new(TantivySearchProvider::new()),
        }
    }
}

/// Name-to-factory table used when a search manager picks its provider
#[derive(Clone)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// A registry with no providers besides the basic fallback
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding every built-in provider
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for provider in BuiltinProvider::iter() {
            registry.register(provider.to_string(), move || Ok(provider.create()));
        }
        registry
    }

    /// Register (or replace) a factory under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> ProviderResult<Arc<dyn SearchProvider>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(&self, name: &str) -> Option<&ProviderFactory> {
        let name = name.trim();
        self.factories.get(name).or_else(|| {
            let builtin = BuiltinProvider::from_str(name).ok()?;
            self.factories.get(&builtin.to_string())
        })
    }

    /// Build the provider registered under `name`
    pub fn create(&self, name: &str) -> ProviderResult<Arc<dyn SearchProvider>> {
        let factory = self
            .resolve(name)
            .ok_or_else(|| SearchError::ProviderNotFound(name.to_string()))?;

        factory().map_err(|e| match e {
            e @ SearchError::ProviderConstruction { .. } => e,
            other => SearchError::ProviderConstruction {
                provider: name.to_string(),
                message: other.to_string(),
            },
        })
    }

    /// Build the provider registered under `name`, falling back to the basic
    /// provider when it is unknown or its factory fails.
    pub fn create_or_fallback(&self, name: &str) -> Arc<dyn SearchProvider> {
        match self.create(name) {
            Ok(provider) => {
                info!(provider = provider.name(), "Search provider selected");
                provider
            }
            Err(e) => {
                warn!(
                    requested = name,
                    error_code = e.error_code(),
                    error = %e,
                    "Failed to load search provider, using basic search"
                );
                BuiltinProvider::Basic.create()
            }
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
