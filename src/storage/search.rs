use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{PostDbRow, Post, SearchError, SearchQuery};
use crate::util::MAX_SEARCH_QUERY_LENGTH;

/// Maximum number of matches returned by a search
pub const SEARCH_LIMIT: i64 = 20;

/// Escape LIKE wildcards so user input matches literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Database {
    // ========================================================================
    // Search Operations
    // ========================================================================

    /// Search posts by title and/or description substring (case-insensitive).
    ///
    /// Returns at most [`SEARCH_LIMIT`] matches, newest first.
    ///
    /// # Errors
    ///
    /// `SearchError::MissingQuery` when neither parameter is given,
    /// `SearchError::TooLong` for oversized input, and `SearchError::Backend`
    /// for database failures.
    pub async fn search_posts(&self, query: &SearchQuery) -> Result<Vec<Post>, SearchError> {
        self.search_posts_limited(query, SEARCH_LIMIT).await
    }

    /// Like [`search_posts`](Self::search_posts) with an explicit result cap.
    pub async fn search_posts_limited(
        &self,
        query: &SearchQuery,
        limit: i64,
    ) -> Result<Vec<Post>, SearchError> {
        let (title, description) = query.normalized().ok_or(SearchError::MissingQuery)?;

        for term in [title, description].into_iter().flatten() {
            if term.chars().count() > MAX_SEARCH_QUERY_LENGTH {
                return Err(SearchError::TooLong(MAX_SEARCH_QUERY_LENGTH));
            }
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT id, title, image, video, description, slug, category, source, \
             subreddit, upvotes, created_at, address FROM posts WHERE ",
        );
        let mut clauses = builder.separated(" OR ");
        if let Some(title) = title {
            clauses
                .push("title LIKE ")
                .push_bind_unseparated(like_pattern(title))
                .push_unseparated(" ESCAPE '\\'");
        }
        if let Some(description) = description {
            clauses
                .push("description LIKE ")
                .push_bind_unseparated(like_pattern(description))
                .push_unseparated(" ESCAPE '\\'");
        }
        builder
            .push(" ORDER BY created_at DESC, rowid ASC LIMIT ")
            .push_bind(limit.max(1));

        tracing::debug!(title = ?title, description = ?description, limit, "search_posts");

        let rows = builder
            .build_query_as::<PostDbRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Search query failed");
                SearchError::Backend(e.to_string())
            })?;

        Ok(rows.into_iter().map(PostDbRow::into_post).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewPost;
    use chrono::{TimeZone, Utc};

    async fn seeded_db() -> Database {
        let db = Database::open(":memory:").await.unwrap();
        let posts: Vec<NewPost> = [
            ("Cat learns to skateboard", "A very talented cat", 100),
            ("Dog rescue story", "Firefighters save a dog", 200),
            ("Market update", "Stocks CAT up 3%", 300),
            ("100% legit", "underscore_name", 400),
        ]
        .into_iter()
        .map(|(title, description, ts)| NewPost {
            title: title.to_string(),
            description: description.to_string(),
            category: "funny".to_string(),
            source: "reddit".to_string(),
            created_at: Some(Utc.timestamp_opt(ts, 0).unwrap()),
            ..Default::default()
        })
        .collect();
        db.import_posts(&posts).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_search_title_and_description_case_insensitive() {
        let db = seeded_db().await;
        let results = db.search_posts(&SearchQuery::matching("cat")).await.unwrap();
        let titles: Vec<&str> = results.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Market update", "Cat learns to skateboard"]);
    }

    #[tokio::test]
    async fn test_search_title_only() {
        let db = seeded_db().await;
        let query = SearchQuery {
            title: Some("DOG".into()),
            description: None,
        };
        let results = db.search_posts(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Dog rescue story");
    }

    #[tokio::test]
    async fn test_search_missing_query_is_client_error() {
        let db = seeded_db().await;
        let err = db.search_posts(&SearchQuery::default()).await.unwrap_err();
        assert_eq!(err, SearchError::MissingQuery);

        let blank = SearchQuery {
            title: Some("   ".into()),
            description: Some(String::new()),
        };
        assert_eq!(db.search_posts(&blank).await.unwrap_err(), SearchError::MissingQuery);
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let db = seeded_db().await;
        let percent = db.search_posts(&SearchQuery::matching("100%")).await.unwrap();
        assert_eq!(percent.len(), 1);

        let underscore = db.search_posts(&SearchQuery::matching("e_n")).await.unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].title, "100% legit");
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let db = Database::open(":memory:").await.unwrap();
        let posts: Vec<NewPost> = (0..30)
            .map(|i| NewPost {
                title: format!("Clip number {}", i),
                category: "gaming".into(),
                source: "youtube".into(),
                created_at: Some(Utc.timestamp_opt(i, 0).unwrap()),
                ..Default::default()
            })
            .collect();
        db.import_posts(&posts).await.unwrap();

        let results = db.search_posts(&SearchQuery::matching("clip")).await.unwrap();
        assert_eq!(results.len(), SEARCH_LIMIT as usize);
        assert_eq!(results[0].title, "Clip number 29");
    }

    #[tokio::test]
    async fn test_search_explicit_limit() {
        let db = seeded_db().await;
        let results = db
            .search_posts_limited(&SearchQuery::matching("cat"), 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Market update");
    }

    #[tokio::test]
    async fn test_search_rejects_long_query() {
        let db = seeded_db().await;
        let long = "a".repeat(MAX_SEARCH_QUERY_LENGTH + 1);
        let err = db.search_posts(&SearchQuery::matching(&long)).await.unwrap_err();
        assert!(matches!(err, SearchError::TooLong(_)));
    }
}
