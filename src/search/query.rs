//! Query parsing
//!
//! Two query dialects live here: the simple `+required -forbidden optional`
//! word list scanned by the basic provider, and the tantivy query language
//! used by the full-text provider.

use crate::search::error::{ProviderResult, SearchError};
use regex::{Regex, RegexBuilder};
use tantivy::query::{Query, QueryParser};
use tantivy::schema::Field;
use tantivy::Index;

/// Extra score a query word earns when it appears in the page name
pub const NAME_MATCH_WEIGHT: f32 = 5.0;

/// How a query word constrains the result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryItemKind {
    /// `+word`: pages without it are excluded
    Required,
    /// `-word`: pages with it are excluded
    Forbidden,
    /// `word`: contributes to the score only
    Requested,
}

/// One word of a basic query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem {
    pub word: String,
    pub kind: QueryItemKind,
}

/// Split a basic query into its items.
///
/// Words are separated by whitespace or commas. A lone `+` or `-` is
/// dropped.
pub fn parse_query(query: &str) -> Vec<QueryItem> {
    query
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(|token| {
            let (kind, word) = if let Some(word) = token.strip_prefix('+') {
                (QueryItemKind::Required, word)
            } else if let Some(word) = token.strip_prefix('-') {
                (QueryItemKind::Forbidden, word)
            } else {
                (QueryItemKind::Requested, token)
            };
            (!word.is_empty()).then(|| QueryItem {
                word: word.to_string(),
                kind,
            })
        })
        .collect()
}

/// Compiled basic query, matched against page names and text
#[derive(Debug)]
pub struct ContentMatcher {
    items: Vec<(QueryItemKind, Regex)>,
}

impl ContentMatcher {
    /// Compile a basic query. Returns `None` for a query with no words.
    pub fn new(query: &str) -> ProviderResult<Option<Self>> {
        let items = parse_query(query)
            .into_iter()
            .map(|item| {
                RegexBuilder::new(&regex::escape(&item.word))
                    .case_insensitive(true)
                    .build()
                    .map(|re| (item.kind, re))
                    .map_err(|e| SearchError::QueryParsingFailed(e.to_string()))
            })
            .collect::<ProviderResult<Vec<_>>>()?;

        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self { items }))
        }
    }

    /// Score a page; `None` when the page does not match.
    ///
    /// A page matches when it contains every required word, no forbidden
    /// word, and at least one positive word.
    pub fn score(&self, name: &str, text: &str) -> Option<f32> {
        let mut score = 0.0;
        let mut found_any = false;

        for (kind, re) in &self.items {
            let in_name = re.is_match(name);
            let occurrences = re.find_iter(text).count();
            let found = in_name || occurrences > 0;

            match kind {
                QueryItemKind::Forbidden if found => return None,
                QueryItemKind::Forbidden => continue,
                QueryItemKind::Required if !found => return None,
                _ => {}
            }

            if found {
                found_any = true;
                score += occurrences as f32;
                if in_name {
                    score += NAME_MATCH_WEIGHT;
                }
            }
        }

        found_any.then_some(score)
    }
}

/// Builds tantivy queries over the page name and body fields
pub struct QueryBuilder {
    parser: QueryParser,
}

impl QueryBuilder {
    /// Create a query builder; terms without a field prefix search both
    /// `name` and `contents`, with name matches boosted.
    pub fn new(index: &Index, name: Field, contents: Field) -> Self {
        let mut parser = QueryParser::for_index(index, vec![name, contents]);
        parser.set_field_boost(name, NAME_MATCH_WEIGHT);
        Self { parser }
    }

    /// Parse a query string in tantivy syntax
    pub fn build(&self, query: &str) -> ProviderResult<Box<dyn Query>> {
        Ok(self.parser.parse_query(query)?)
    }
}
