//! Search document structures and indexing

use crate::models::Page;
use crate::search::error::{ProviderResult, SearchError};
use serde::{Deserialize, Serialize};
use tantivy::schema::*;
use tantivy::TantivyDocument;

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, fields: &PageFields) -> TantivyDocument;

    /// Get document ID
    fn document_id(&self) -> &str;
}

/// Handles to the fields of the page schema
#[derive(Debug, Clone, Copy)]
pub struct PageFields {
    /// Full page path, untokenized; the document key
    pub id: Field,
    /// Page name, tokenized with word boundaries split out
    pub name: Field,
    /// Page text
    pub contents: Field,
    /// Page version at indexing time
    pub version: Field,
}

impl PageFields {
    /// Look up the page fields in a schema
    pub fn new(schema: &Schema) -> ProviderResult<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| SearchError::SchemaError(format!("{}: {}", name, e)))
        };

        Ok(Self {
            id: field("id")?,
            name: field("name")?,
            contents: field("contents")?,
            version: field("version")?,
        })
    }
}

/// Page document for search indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocument {
    /// Page path
    pub id: String,

    /// Searchable form of the page name
    pub name: String,

    /// Page text
    pub contents: String,

    /// Page version
    pub version: u64,
}

impl From<&Page> for PageDocument {
    fn from(page: &Page) -> Self {
        Self {
            id: page.path.as_str().to_string(),
            name: beautify_name(page.name()),
            contents: page.content.clone(),
            version: page.version,
        }
    }
}

impl SearchDocument for PageDocument {
    fn to_tantivy_doc(&self, fields: &PageFields) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(fields.id, &self.id);
        doc.add_text(fields.name, &self.name);
        doc.add_text(fields.contents, &self.contents);
        doc.add_u64(fields.version, self.version);
        doc
    }

    fn document_id(&self) -> &str {
        &self.id
    }
}

/// Build the search schema for pages
pub fn build_page_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // ID - stored, indexed as a single term
    schema_builder.add_text_field("id", STRING | STORED);

    schema_builder.add_text_field("name", TEXT | STORED);

    // Page body is fetched from the store, never from the index
    schema_builder.add_text_field("contents", TEXT);

    schema_builder.add_u64_field("version", STORED);

    schema_builder.build()
}

/// Split a CamelCase page name into words so each part is searchable.
///
/// `HelloPage` becomes `Hello Page`, `HTTPServer2` becomes `HTTP Server 2`.
pub fn beautify_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);

    for (i, &ch) in chars.iter().enumerate() {
        if i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && ch.is_uppercase())
                || (prev.is_uppercase()
                    && ch.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()))
                || (prev.is_alphabetic() && ch.is_ascii_digit())
                || (prev.is_ascii_digit() && ch.is_alphabetic());
            if boundary && !out.ends_with(' ') {
                out.push(' ');
            }
        }
        out.push(ch);
    }

    out
}
