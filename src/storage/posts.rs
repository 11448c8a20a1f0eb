use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{DatabaseError, FeedScope, NewPost, Post, PostDbRow};
use crate::util::slugify;

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Maximum number of posts returned by a single feed query (OOM protection)
const MAX_POSTS: i64 = 5000;

/// Imports are committed in chunks of this many posts
const IMPORT_BATCH_SIZE: usize = 100;

const POST_COLUMNS: &str = "id, title, image, video, description, slug, category, source, \
                            subreddit, upvotes, created_at, address";

/// Stable 24-hex-char identifier derived from the unique (category, source, slug) triple.
pub(crate) fn post_id(category: &str, source: &str, slug: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(b"/");
    hasher.update(source.as_bytes());
    hasher.update(b"/");
    hasher.update(slug.as_bytes());
    let digest = hasher.finalize();
    digest[..12].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Media and outbound links must be absolute http(s) URLs.
fn validate_link(field: &str, value: Option<&str>) -> Result<Option<String>, DatabaseError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(Some(parsed.to_string())),
        Ok(parsed) => Err(DatabaseError::InvalidPost(format!(
            "{} must use http or https, got '{}'",
            field,
            parsed.scheme()
        ))),
        Err(e) => Err(DatabaseError::InvalidPost(format!(
            "{} is not a valid URL: {}",
            field, e
        ))),
    }
}

/// Validate and normalize a post before it is written.
fn prepare(post: &NewPost) -> Result<Post, DatabaseError> {
    let title = post.title.trim();
    if title.is_empty() {
        return Err(DatabaseError::InvalidPost("title is required".into()));
    }
    let category = slugify(&post.category);
    if category.is_empty() {
        return Err(DatabaseError::InvalidPost("category is required".into()));
    }
    let source = slugify(&post.source);
    if source.is_empty() {
        return Err(DatabaseError::InvalidPost("source is required".into()));
    }
    let slug = match post.slug.as_deref().map(slugify) {
        Some(slug) if !slug.is_empty() => slug,
        _ => slugify(title),
    };
    if slug.is_empty() {
        return Err(DatabaseError::InvalidPost(format!(
            "cannot derive a slug from title '{}'",
            title
        )));
    }

    Ok(Post {
        id: post_id(&category, &source, &slug),
        title: title.to_string(),
        image: validate_link("image", post.image.as_deref())?,
        video: validate_link("video", post.video.as_deref())?,
        description: post.description.trim().to_string(),
        slug,
        category,
        source,
        subreddit: post
            .subreddit
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        upvotes: post.upvotes,
        created_at: post.created_at.unwrap_or_else(Utc::now),
        address: validate_link("address", post.address.as_deref())?,
    })
}

impl Database {
    // ========================================================================
    // Post Writes
    // ========================================================================

    /// Insert a post, replacing any existing post with the same
    /// category/source/slug. Returns the stored post.
    pub async fn insert_post(&self, post: &NewPost) -> Result<Post, DatabaseError> {
        let prepared = prepare(post)?;
        let mut tx = self.pool.begin().await?;
        upsert(&mut tx, &prepared).await?;
        tx.commit().await?;

        tracing::info!(id = %prepared.id, slug = %prepared.slug, category = %prepared.category, source = %prepared.source, "Post stored");
        Ok(prepared)
    }

    /// Import many posts. Invalid posts are skipped with a warning; the count
    /// of stored posts is returned.
    pub async fn import_posts(&self, posts: &[NewPost]) -> Result<usize, DatabaseError> {
        let mut stored = 0;
        for chunk in posts.chunks(IMPORT_BATCH_SIZE) {
            let mut tx = self.pool.begin().await?;
            for post in chunk {
                match prepare(post) {
                    Ok(prepared) => {
                        upsert(&mut tx, &prepared).await?;
                        stored += 1;
                    }
                    Err(e) => {
                        tracing::warn!(title = %post.title, error = %e, "Skipping invalid post");
                    }
                }
            }
            tx.commit().await?;
        }
        tracing::info!(stored, total = posts.len(), "Import finished");
        Ok(stored)
    }

    // ========================================================================
    // Post Queries
    // ========================================================================

    /// All posts in `scope`, newest first.
    pub async fn get_posts(&self, scope: &FeedScope) -> Result<Vec<Post>, DatabaseError> {
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM posts WHERE 1 = 1", POST_COLUMNS));

        match scope {
            FeedScope::All => {}
            FeedScope::Category(category) => {
                builder.push(" AND category = ").push_bind(category.as_str());
            }
            FeedScope::CategorySource { category, source } => {
                builder.push(" AND category = ").push_bind(category.as_str());
                builder.push(" AND source = ").push_bind(source.as_str());
            }
            FeedScope::Collection(filters) => {
                if let Some(source) = &filters.source {
                    builder.push(" AND source = ").push_bind(source.as_str());
                }
                if let Some(category) = &filters.category {
                    builder.push(" AND category = ").push_bind(category.as_str());
                }
                if let Some((from, until)) = filters.created_between {
                    builder.push(" AND created_at >= ").push_bind(from);
                    builder.push(" AND created_at < ").push_bind(until);
                }
            }
        }

        builder
            .push(" ORDER BY created_at DESC, rowid ASC LIMIT ")
            .push_bind(MAX_POSTS);

        let rows = builder
            .build_query_as::<PostDbRow>()
            .fetch_all(&self.pool)
            .await?;
        tracing::debug!(scope = ?scope, count = rows.len(), "get_posts");
        Ok(rows.into_iter().map(PostDbRow::into_post).collect())
    }

    /// Look up a post for the detail view.
    pub async fn get_post(
        &self,
        category: &str,
        source: &str,
        slug: &str,
    ) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query_as::<_, PostDbRow>(&format!(
            "SELECT {} FROM posts WHERE category = ? AND source = ? AND slug = ?",
            POST_COLUMNS
        ))
        .bind(category)
        .bind(source)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PostDbRow::into_post))
    }

    pub async fn count_posts(&self) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

async fn upsert(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    post: &Post,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO posts (id, title, image, video, description, slug, category, source,
                           subreddit, upvotes, created_at, address)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(category, source, slug) DO UPDATE SET
            title = excluded.title,
            image = excluded.image,
            video = excluded.video,
            description = excluded.description,
            subreddit = excluded.subreddit,
            upvotes = excluded.upvotes,
            created_at = excluded.created_at,
            address = excluded.address
    "#,
    )
    .bind(&post.id)
    .bind(&post.title)
    .bind(&post.image)
    .bind(&post.video)
    .bind(&post.description)
    .bind(&post.slug)
    .bind(&post.category)
    .bind(&post.source)
    .bind(&post.subreddit)
    .bind(post.upvotes)
    .bind(post.created_at.timestamp_millis())
    .bind(&post.address)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
