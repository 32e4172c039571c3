pub mod locks;
pub mod store;

pub use locks::{PathGuard, PathLocks};
pub use store::*;

use crate::error::Result;
use crate::models::{Page, PagePath};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Read access to the page store, as seen by the search subsystem
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Get the current version of a page; `None` when the store has no such page
    async fn get_page(&self, path: &PagePath) -> Result<Option<Page>>;

    /// Names of every page the store knows about, in name order
    async fn find_all_page_names(&self) -> Result<BTreeSet<String>>;
}
