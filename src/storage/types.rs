use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of freshfeed appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A post failed validation before reaching the database
    #[error("Invalid post: {0}")]
    InvalidPost(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as
/// "another instance" to the user.
pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

/// Search failures.
///
/// `MissingQuery` mirrors a client error on the search contract: neither a
/// title nor a description substring was supplied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Missing search query: provide title and/or description")]
    MissingQuery,

    #[error("Search query exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("Search failed: {0}")]
    Backend(String),
}

// ============================================================================
// Posts
// ============================================================================

/// A post summary as served to feed views.
///
/// Immutable once loaded. Identity is `id`; feeds order by `created_at`
/// descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub description: String,
    pub slug: String,
    pub category: String,
    pub source: String,
    pub subreddit: Option<String>,
    pub upvotes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub address: Option<String>,
}

impl Post {
    /// Route of the detail view for this post.
    pub fn detail_path(&self) -> String {
        format!("/{}/{}/{}", self.category, self.source, self.slug)
    }
}

/// Input for inserting or importing a post.
///
/// `slug` and `created_at` are optional: a slug is derived from the title and
/// the creation time defaults to now.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub category: String,
    pub source: String,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub upvotes: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Internal row type for post queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostDbRow {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub description: String,
    pub slug: String,
    pub category: String,
    pub source: String,
    pub subreddit: Option<String>,
    pub upvotes: Option<i64>,
    pub created_at: i64,
    pub address: Option<String>,
}

impl PostDbRow {
    pub(crate) fn into_post(self) -> Post {
        Post {
            id: self.id,
            title: self.title,
            image: self.image,
            video: self.video,
            description: self.description,
            slug: self.slug,
            category: self.category,
            source: self.source,
            subreddit: self.subreddit,
            upvotes: self.upvotes,
            created_at: Utc
                .timestamp_millis_opt(self.created_at)
                .single()
                .unwrap_or_default(),
            address: self.address,
        }
    }
}

// ============================================================================
// Scopes and Queries
// ============================================================================

/// Which posts a feed view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    All,
    Category(String),
    CategorySource { category: String, source: String },
    Collection(CollectionFilters),
}

/// Filters derived from a collection name such as `best-of-reddit-2025`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFilters {
    pub name: String,
    pub source: Option<String>,
    pub category: Option<String>,
    /// Half-open `[from, until)` range in epoch milliseconds.
    pub created_between: Option<(i64, i64)>,
}

/// Free-text search parameters.
///
/// Either substring may be absent but not both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl SearchQuery {
    /// Match `text` against both title and description.
    pub fn matching(text: &str) -> Self {
        Self {
            title: Some(text.to_string()),
            description: Some(text.to_string()),
        }
    }

    /// Drop blank parameters; `None` when nothing remains.
    pub(crate) fn normalized(&self) -> Option<(Option<&str>, Option<&str>)> {
        let title = self.title.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if title.is_none() && description.is_none() {
            None
        } else {
            Some((title, description))
        }
    }
}
