//! Sort & filter stage.
//!
//! Turns the raw feed plus the current search text into the one ordered
//! sequence the window manager pages over. An empty query browses the local
//! feed newest first; a non-empty query hands off to the search backend and
//! the sequence stays unavailable until the matching generation reports back.

use std::sync::Arc;

use crate::storage::{Post, SearchError};

/// Immutable, shared ordered sequence of posts.
pub type Sequence = Arc<[Post]>;

/// Stable sort by `created_at`, newest first.
///
/// Posts with equal timestamps keep their input order.
pub fn sort_newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}

/// What the feed currently pages over.
#[derive(Debug, Clone)]
pub enum ActiveSequence {
    /// No query: the local feed, newest first.
    Browse(Sequence),
    /// A search was requested and has not answered yet.
    Pending { query: String },
    /// Ranked search results, in backend order.
    Results { query: String, posts: Sequence },
    /// The search failed. Distinct from an empty result set.
    Failed { query: String, error: SearchError },
}

impl ActiveSequence {
    /// The sequence to page over, or `None` while pending or failed.
    pub fn posts(&self) -> Option<&Sequence> {
        match self {
            ActiveSequence::Browse(posts) | ActiveSequence::Results { posts, .. } => Some(posts),
            ActiveSequence::Pending { .. } | ActiveSequence::Failed { .. } => None,
        }
    }
}

/// Effect of a query edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryChange {
    /// Same effective query as before; nothing to do.
    Unchanged,
    /// Back to browsing; the sequence is available immediately.
    Cleared,
    /// A search must be scheduled for this generation.
    Search { generation: u64, query: String },
}

pub struct SortFilterStage {
    source: Sequence,
    query: String,
    generation: u64,
    active: ActiveSequence,
}

impl Default for SortFilterStage {
    fn default() -> Self {
        Self::new()
    }
}

impl SortFilterStage {
    pub fn new() -> Self {
        let source: Sequence = Arc::from(Vec::<Post>::new());
        Self {
            active: ActiveSequence::Browse(source.clone()),
            source,
            query: String::new(),
            generation: 0,
        }
    }

    /// Replace the raw feed. Returns true when the active sequence changed,
    /// i.e. the stage is browsing rather than showing search state.
    pub fn set_source(&mut self, posts: Vec<Post>) -> bool {
        self.source = sort_newest_first(posts).into();
        if self.query.is_empty() {
            self.active = ActiveSequence::Browse(self.source.clone());
            true
        } else {
            false
        }
    }

    pub fn source(&self) -> &Sequence {
        &self.source
    }

    /// Apply the text from the search input.
    pub fn set_query(&mut self, text: &str) -> QueryChange {
        let trimmed = text.trim();
        if trimmed == self.query {
            return QueryChange::Unchanged;
        }
        self.query = trimmed.to_string();
        self.generation = self.generation.wrapping_add(1);

        if self.query.is_empty() {
            self.active = ActiveSequence::Browse(self.source.clone());
            tracing::debug!(generation = self.generation, "Search cleared");
            QueryChange::Cleared
        } else {
            self.active = ActiveSequence::Pending {
                query: self.query.clone(),
            };
            QueryChange::Search {
                generation: self.generation,
                query: self.query.clone(),
            }
        }
    }

    /// Accept a search response. Returns false when it was stale and dropped.
    pub fn complete_search(
        &mut self,
        generation: u64,
        query: String,
        result: Result<Vec<Post>, SearchError>,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(
                expected = self.generation,
                got = generation,
                query = %query,
                "Ignoring stale search result (generation mismatch)"
            );
            return false;
        }

        self.active = match result {
            Ok(posts) => {
                tracing::debug!(query = %query, count = posts.len(), "Search completed");
                ActiveSequence::Results {
                    query,
                    posts: posts.into(),
                }
            }
            Err(error) => {
                tracing::warn!(query = %query, error = %error, "Search failed");
                ActiveSequence::Failed { query, error }
            }
        };
        true
    }

    pub fn active(&self) -> &ActiveSequence {
        &self.active
    }

    pub fn sequence(&self) -> Option<Sequence> {
        self.active.posts().cloned()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.active, ActiveSequence::Pending { .. })
    }
}
