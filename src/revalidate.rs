//! Cached rendered pages and their invalidation.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Marks the cached render of a route as stale so the next request recomputes it.
#[async_trait]
pub trait Revalidate: Send + Sync {
    async fn revalidate_path(&self, path: &str);
}

#[derive(Debug, Default)]
struct Pages {
    rendered: HashMap<String, String>,
    /// Bumped on every revalidation.
    generation: u64,
}

/// In-memory cache of rendered pages keyed by route path.
///
/// A render started before a revalidation must not land in the cache: take
/// `generation()` before reading the data and store with `insert_if_current`.
#[derive(Debug, Clone, Default)]
pub struct RouteCache {
    pages: Arc<RwLock<Pages>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<String> {
        self.pages.read().await.rendered.get(path).cloned()
    }

    pub async fn generation(&self) -> u64 {
        self.pages.read().await.generation
    }

    /// Store `page` unless a revalidation happened since `seen` was read.
    /// Returns whether the page was stored.
    pub async fn insert_if_current(&self, path: &str, page: String, seen: u64) -> bool {
        let mut pages = self.pages.write().await;
        if pages.generation != seen {
            return false;
        }
        pages.rendered.insert(path.to_string(), page);
        true
    }

    pub async fn len(&self) -> usize {
        self.pages.read().await.rendered.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pages.read().await.rendered.is_empty()
    }
}

#[async_trait]
impl Revalidate for RouteCache {
    async fn revalidate_path(&self, path: &str) {
        let mut pages = self.pages.write().await;
        pages.generation += 1;
        let evicted = pages.rendered.remove(path).is_some();
        debug!(path, evicted, "revalidated path");
    }
}
