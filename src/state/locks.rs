//! Per-page async locks

use crate::models::PagePath;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per page path, created on demand.
///
/// Entries are dropped again once nobody holds or waits for them.
#[derive(Default)]
pub struct PathLocks {
    locks: DashMap<PagePath, Arc<Mutex<()>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`
    pub async fn lock(&self, path: &PagePath) -> PathGuard<'_> {
        let lock = Arc::clone(self.locks.entry(path.clone()).or_default().value());
        let guard = lock.lock_owned().await;
        PathGuard {
            locks: self,
            path: path.clone(),
            guard: Some(guard),
        }
    }

    /// Number of paths currently locked or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held access to one page path
pub struct PathGuard<'a> {
    locks: &'a PathLocks,
    path: PagePath,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own clone, so a count of one means the map is the last owner
        self.locks
            .locks
            .remove_if(&self.path, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_path_is_exclusive() {
        let locks = Arc::new(PathLocks::new());
        let path = PagePath::new("Main");

        let held = locks.lock(&path).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let path = path.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&path).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_other_paths_are_independent() {
        let locks = PathLocks::new();
        let _main = locks.lock(&PagePath::new("Main")).await;
        let _other = locks.lock(&PagePath::new("Other")).await;
        assert_eq!(locks.len(), 2);
    }
}
