//! Integration tests for post storage: import, feed scopes, collections,
//! detail lookups and search.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use chrono::{TimeZone, Utc};
use freshfeed::router::Route;
use freshfeed::storage::{Database, DatabaseError, FeedScope, NewPost, SearchError, SearchQuery};
use pretty_assertions::assert_eq;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn new_post(title: &str, category: &str, source: &str, created_at: i64) -> NewPost {
    NewPost {
        title: title.to_string(),
        category: category.to_string(),
        source: source.to_string(),
        created_at: Some(Utc.timestamp_opt(created_at, 0).unwrap()),
        ..Default::default()
    }
}

/// 2025-07-15 12:00:00 UTC
const JULY_2025: i64 = 1_752_580_800;
/// 2024-03-10 12:00:00 UTC
const MARCH_2024: i64 = 1_710_072_000;

async fn seeded_db() -> Database {
    let db = test_db().await;
    let posts = vec![
        new_post("Cat plays piano", "funny", "reddit", JULY_2025),
        new_post("Dog learns to surf", "funny", "x", JULY_2025 + 60),
        new_post("Election results", "news", "x", JULY_2025 + 120),
        new_post("Speedrun record", "gaming", "youtube", MARCH_2024),
        new_post("Cat café opens downtown", "lifestyle", "reddit", MARCH_2024 + 60),
    ];
    assert_eq!(db.import_posts(&posts).await.unwrap(), 5);
    db
}

fn titles(posts: &[freshfeed::storage::Post]) -> Vec<&str> {
    posts.iter().map(|p| p.title.as_str()).collect()
}

// ============================================================================
// Import and Lookup
// ============================================================================

#[tokio::test]
async fn test_import_skips_invalid_posts() {
    let db = test_db().await;
    let posts = vec![
        new_post("Valid", "news", "x", JULY_2025),
        new_post("   ", "news", "x", JULY_2025),
        NewPost {
            address: Some("ftp://example.com/file".into()),
            ..new_post("Bad link", "news", "x", JULY_2025)
        },
    ];
    assert_eq!(db.import_posts(&posts).await.unwrap(), 1);
    assert_eq!(db.count_posts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_insert_rejects_missing_category() {
    let db = test_db().await;
    let err = db
        .insert_post(&new_post("Orphan", "", "x", JULY_2025))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidPost(_)));
}

#[tokio::test]
async fn test_reimport_replaces_same_slug() {
    let db = test_db().await;
    db.insert_post(&new_post("Cat plays piano", "funny", "reddit", JULY_2025))
        .await
        .unwrap();
    let updated = NewPost {
        description: "Now with video".into(),
        ..new_post("Cat plays piano", "funny", "reddit", JULY_2025)
    };
    db.insert_post(&updated).await.unwrap();

    assert_eq!(db.count_posts().await.unwrap(), 1);
    let post = db
        .get_post("funny", "reddit", "cat-plays-piano")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.description, "Now with video");
    assert_eq!(post.id.len(), 24);
}

#[tokio::test]
async fn test_detail_route_finds_post() {
    let db = seeded_db().await;
    let all = db.get_posts(&FeedScope::All).await.unwrap();
    let first = &all[0];

    let Route::Post {
        category,
        source,
        slug,
    } = Route::parse(&first.detail_path()).unwrap()
    else {
        panic!("detail path should parse as a post route");
    };
    let found = db.get_post(&category, &source, &slug).await.unwrap();
    assert_eq!(found.as_ref(), Some(first));

    assert_eq!(db.get_post("news", "x", "missing").await.unwrap(), None);
}

// ============================================================================
// Feed Scopes
// ============================================================================

#[tokio::test]
async fn test_home_feed_is_newest_first() {
    let db = seeded_db().await;
    let posts = db.get_posts(&FeedScope::All).await.unwrap();
    assert_eq!(
        titles(&posts),
        vec![
            "Election results",
            "Dog learns to surf",
            "Cat plays piano",
            "Cat café opens downtown",
            "Speedrun record",
        ]
    );
}

#[tokio::test]
async fn test_route_scopes_filter_posts() {
    let db = seeded_db().await;

    let scope = Route::parse("/funny").unwrap().scope().unwrap();
    let posts = db.get_posts(&scope).await.unwrap();
    assert_eq!(titles(&posts), vec!["Dog learns to surf", "Cat plays piano"]);

    let scope = Route::parse("/funny/x").unwrap().scope().unwrap();
    let posts = db.get_posts(&scope).await.unwrap();
    assert_eq!(titles(&posts), vec!["Dog learns to surf"]);
}

#[tokio::test]
async fn test_collection_routes_filter_posts() {
    let db = seeded_db().await;

    let scope = Route::parse("/collections/best-of-reddit-2025")
        .unwrap()
        .scope()
        .unwrap();
    let posts = db.get_posts(&scope).await.unwrap();
    assert_eq!(titles(&posts), vec!["Cat plays piano"]);

    let scope = Route::parse("/collections/funny-x-july-2025")
        .unwrap()
        .scope()
        .unwrap();
    let posts = db.get_posts(&scope).await.unwrap();
    assert_eq!(titles(&posts), vec!["Dog learns to surf"]);

    let scope = Route::parse("/collections/march-2024").unwrap().scope().unwrap();
    let posts = db.get_posts(&scope).await.unwrap();
    assert_eq!(
        titles(&posts),
        vec!["Cat café opens downtown", "Speedrun record"]
    );
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_matches_title_case_insensitively() {
    let db = seeded_db().await;
    let posts = db.search_posts(&SearchQuery::matching("CAT")).await.unwrap();
    assert_eq!(
        titles(&posts),
        vec!["Cat plays piano", "Cat café opens downtown"]
    );
}

#[tokio::test]
async fn test_search_requires_a_parameter() {
    let db = seeded_db().await;
    let err = db.search_posts(&SearchQuery::default()).await.unwrap_err();
    assert!(matches!(err, SearchError::MissingQuery));
}
