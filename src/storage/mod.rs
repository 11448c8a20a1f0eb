mod collections;
mod posts;
mod schema;
mod search;
mod types;

pub use collections::parse_collection_name;
pub use schema::Database;
pub use search::SEARCH_LIMIT;
pub use types::{
    CollectionFilters, DatabaseError, FeedScope, NewPost, Post, SearchError, SearchQuery,
};
