//! Transport shaping for remote callers
//!
//! [`JsonSearch`] turns search results into flat, serializable, size-capped
//! lists and answers the `search.getSuggestions` and `search.findPages` RPC
//! methods. It never fails on the search side: errors come back as empty
//! lists.

use crate::rpc::{RpcCallable, RpcError};
use crate::search::manager::SearchManager;
use crate::search::provider::SearchResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Weak;

/// Name the adapter is registered under on the RPC registry
pub const JSON_SEARCH: &str = "search";

/// Default cap when a caller does not give one
pub const DEFAULT_MAX_LENGTH: usize = 20;

/// One search hit as sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportHit {
    /// Page name, attachment suffix included
    pub page: String,
    pub score: f32,
}

impl From<SearchResult> for TransportHit {
    fn from(result: SearchResult) -> Self {
        Self {
            page: result.page().name().to_string(),
            score: result.score(),
        }
    }
}

/// Parameters accepted by both RPC methods
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CallParams {
    Positional(String, usize),
    Text((String,)),
    Named {
        #[serde(alias = "wikiName", alias = "query")]
        text: String,
        #[serde(alias = "maxLength", default = "default_max_length")]
        max: usize,
    },
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

impl CallParams {
    fn into_parts(self) -> (String, usize) {
        match self {
            CallParams::Positional(text, max) => (text, max),
            CallParams::Text((text,)) => (text, DEFAULT_MAX_LENGTH),
            CallParams::Named { text, max } => (text, max),
        }
    }
}

/// RPC adapter over a [`SearchManager`]
pub struct JsonSearch {
    manager: Weak<SearchManager>,
}

impl JsonSearch {
    pub fn new(manager: Weak<SearchManager>) -> Self {
        Self { manager }
    }

    /// Page names starting with `wiki_name`, at most `max_length` of them
    pub async fn get_suggestions(&self, wiki_name: &str, max_length: usize) -> Vec<String> {
        match self.manager.upgrade() {
            Some(manager) => manager.get_suggestions(wiki_name, max_length).await,
            None => Vec::new(),
        }
    }

    /// Ranked hits for `query`, at most `max_length` of them
    pub async fn find_pages(&self, query: &str, max_length: usize) -> Vec<TransportHit> {
        match self.manager.upgrade() {
            Some(manager) => manager.find_pages_for_transport(query, max_length).await,
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl RpcCallable for JsonSearch {
    fn methods(&self) -> &'static [&'static str] {
        &["getSuggestions", "findPages"]
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        if self.manager.strong_count() == 0 {
            return Err(RpcError::Unavailable(JSON_SEARCH.to_string()));
        }

        let (text, max) = serde_json::from_value::<CallParams>(params)
            .map_err(|e| RpcError::InvalidParams(e.to_string()))?
            .into_parts();

        match method {
            "getSuggestions" => Ok(serde_json::to_value(self.get_suggestions(&text, max).await)?),
            "findPages" => Ok(serde_json::to_value(self.find_pages(&text, max).await)?),
            other => Err(RpcError::MethodNotFound(format!("{}.{}", JSON_SEARCH, other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;
    use serde_json::json;

    #[test]
    fn test_transport_hit_from_result() {
        let hit = TransportHit::from(SearchResult::new(Page::new("Main/logo.png", "x"), 2.5));
        assert_eq!(hit.page, "Main/logo.png");
        assert_eq!(
            serde_json::to_value(&hit).unwrap(),
            json!({"page": "Main/logo.png", "score": 2.5})
        );
    }

    #[test]
    fn test_call_params() {
        let parse = |v: Value| serde_json::from_value::<CallParams>(v).unwrap().into_parts();

        assert_eq!(parse(json!(["Ma", 5])), ("Ma".to_string(), 5));
        assert_eq!(parse(json!(["Ma"])), ("Ma".to_string(), DEFAULT_MAX_LENGTH));
        assert_eq!(parse(json!({"wikiName": "Ma", "maxLength": 3})), ("Ma".to_string(), 3));
        assert_eq!(parse(json!({"query": "hello"})), ("hello".to_string(), DEFAULT_MAX_LENGTH));
    }

    #[tokio::test]
    async fn test_dropped_manager() {
        let search = JsonSearch::new(Weak::new());

        assert!(search.get_suggestions("Ma", 10).await.is_empty());
        assert!(search.find_pages("hello", 10).await.is_empty());

        let err = search.call("findPages", json!(["hello", 10])).await.unwrap_err();
        assert!(matches!(err, RpcError::Unavailable(_)));
    }
}
