//! Page search for a wiki
//!
//! A [`search::SearchManager`] keeps a pluggable search provider (a linear
//! scan or a tantivy index) in step with a page store through page events,
//! and answers ranked full-text queries and page-name suggestions, both
//! in-process and over a small JSON-RPC registry.

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod rpc;
pub mod search;
pub mod state;

pub use error::{AppError, Result};
