//! Debounced, cancellable search.
//!
//! Each keystroke reschedules the search: the previous task is aborted, the
//! new one waits out the debounce window and then calls the backend once.
//! Results carry the generation they were spawned for so the sort & filter
//! stage can drop anything that arrives late.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::FeedEvent;
use crate::storage::{Database, Post, SearchError, SearchQuery, SEARCH_LIMIT};

/// Anything that can answer a free-text search.
pub trait SearchBackend: Send + Sync {
    fn search(&self, query: SearchQuery) -> BoxFuture<'static, Result<Vec<Post>, SearchError>>;
}

/// Search against the local post database.
#[derive(Clone)]
pub struct DatabaseSearch {
    db: Database,
    limit: i64,
}

impl DatabaseSearch {
    pub fn new(db: Database, limit: i64) -> Self {
        Self { db, limit }
    }
}

impl From<Database> for DatabaseSearch {
    fn from(db: Database) -> Self {
        Self::new(db, SEARCH_LIMIT)
    }
}

impl SearchBackend for DatabaseSearch {
    fn search(&self, query: SearchQuery) -> BoxFuture<'static, Result<Vec<Post>, SearchError>> {
        let db = self.db.clone();
        let limit = self.limit;
        async move { db.search_posts_limited(&query, limit).await }.boxed()
    }
}

pub struct SearchController {
    backend: Arc<dyn SearchBackend>,
    debounce: Duration,
    handle: Option<JoinHandle<()>>,
}

impl SearchController {
    pub fn new(backend: Arc<dyn SearchBackend>, debounce: Duration) -> Self {
        Self {
            backend,
            debounce,
            handle: None,
        }
    }

    /// Replace any pending search with one for `query`.
    ///
    /// The text is matched against both title and description. The outcome is
    /// delivered as [`FeedEvent::SearchCompleted`].
    pub fn schedule<E>(&mut self, generation: u64, query: String, tx: &mpsc::Sender<E>)
    where
        E: From<FeedEvent> + Send + 'static,
    {
        self.cancel();

        let backend = Arc::clone(&self.backend);
        let debounce = self.debounce;
        let tx = tx.clone();

        tracing::debug!(query = %query, generation, "Spawning debounced search task");

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let result = backend.search(SearchQuery::matching(&query)).await;
            let event = FeedEvent::SearchCompleted {
                generation,
                query,
                result,
            };
            if let Err(e) = tx.send(event.into()).await {
                tracing::warn!(error = %e, "Failed to send search results (receiver dropped)");
            }
        }));
    }

    /// Abort the pending search, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Aborted previous search task");
        }
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.cancel();
    }
}
