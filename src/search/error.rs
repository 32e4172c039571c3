//! Error types for search operations

use crate::error::AppError;

/// Result type for provider and manager operations
pub type ProviderResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// No provider registered under the requested name
    #[error("Search provider not found: {0}")]
    ProviderNotFound(String),

    /// A provider factory failed to build its provider
    #[error("Search provider construction failed ({provider}): {message}")]
    ProviderConstruction { provider: String, message: String },

    /// Query parsing failed
    #[error("Query parsing failed: {0}")]
    QueryParsingFailed(String),

    /// Search execution failed
    #[error("Search execution failed: {0}")]
    SearchFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Document deletion failed
    #[error("Document deletion failed: {0}")]
    DeletionFailed(String),

    /// Schema error
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Index corruption
    #[error("Index corruption detected: {0}")]
    IndexCorruption(String),

    /// Tantivy error
    #[error("Tantivy error: {0}")]
    TantivyError(String),

    /// The page store could not answer
    #[error("Page store error: {0}")]
    Store(String),

    /// The page store and the event stream disagree about a page
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl SearchError {
    /// Whether this error belongs to provider selection or setup
    pub fn is_initialization(&self) -> bool {
        matches!(
            self,
            SearchError::IndexInitFailed(_)
                | SearchError::ProviderNotFound(_)
                | SearchError::ProviderConstruction { .. }
                | SearchError::InvalidConfiguration(_)
        )
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            SearchError::IndexInitFailed(_) => "INDEX_INIT_FAILED",
            SearchError::ProviderNotFound(_) => "PROVIDER_NOT_FOUND",
            SearchError::ProviderConstruction { .. } => "PROVIDER_CONSTRUCTION_FAILED",
            SearchError::QueryParsingFailed(_) => "QUERY_PARSING_FAILED",
            SearchError::SearchFailed(_) => "SEARCH_FAILED",
            SearchError::IndexingFailed(_) => "INDEXING_FAILED",
            SearchError::DeletionFailed(_) => "DELETION_FAILED",
            SearchError::SchemaError(_) => "SCHEMA_ERROR",
            SearchError::IoError(_) => "IO_ERROR",
            SearchError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            SearchError::IndexCorruption(_) => "INDEX_CORRUPTION",
            SearchError::TantivyError(_) => "TANTIVY_ERROR",
            SearchError::Store(_) => "STORE_ERROR",
            SearchError::InternalInconsistency(_) => "INTERNAL_INCONSISTENCY",
        }
    }
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        SearchError::TantivyError(err.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for SearchError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        SearchError::QueryParsingFailed(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::IoError(err) => AppError::Io(err),
            other => AppError::Search {
                code: other.error_code(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_classification() {
        assert!(SearchError::ProviderNotFound("x".to_string()).is_initialization());
        assert!(SearchError::IndexInitFailed("x".to_string()).is_initialization());
        assert!(!SearchError::SearchFailed("x".to_string()).is_initialization());
        assert!(!SearchError::InternalInconsistency("x".to_string()).is_initialization());
    }

    #[test]
    fn test_conversion_to_app_error() {
        let app: AppError = SearchError::InvalidConfiguration("bad".to_string()).into();
        assert_eq!(app.error_code(), "CONFIGURATION_ERROR");

        let app: AppError = SearchError::IndexingFailed("disk full".to_string()).into();
        assert_eq!(app.error_code(), "INDEXING_FAILED");
        assert!(app.to_string().contains("disk full"));
    }
}
