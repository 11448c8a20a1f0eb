//! Navigation paths.
//!
//! Every view is addressed by a path. Feed paths double as keys for the
//! scroll position store, so parsing normalizes them (lowercase, no trailing
//! slash) and `Route::path` always renders the canonical form.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::storage::{parse_collection_name, FeedScope};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Paths must start with '/': {0}")]
    NotAbsolute(String),

    #[error("Invalid path segment: {0:?}")]
    InvalidSegment(String),

    #[error("Too many path segments: {0}")]
    TooDeep(String),

    #[error("Collection path is missing a name")]
    MissingCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Category { category: String },
    CategorySource { category: String, source: String },
    Post { category: String, source: String, slug: String },
    Collection { name: String },
}

/// Segment characters accepted in paths.
fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Route {
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let trimmed = path.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Err(RouteError::NotAbsolute(trimmed.to_string()));
        };
        // Query strings and fragments are not part of the route
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<String> = rest
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect();

        if let Some(bad) = segments.iter().find(|s| !valid_segment(s)) {
            return Err(RouteError::InvalidSegment(bad.clone()));
        }

        match segments.as_slice() {
            [] => Ok(Route::Home),
            [first] if first == "collections" => Err(RouteError::MissingCollection),
            [first, name] if first == "collections" => Ok(Route::Collection { name: name.clone() }),
            [category] => Ok(Route::Category {
                category: category.clone(),
            }),
            [category, source] => Ok(Route::CategorySource {
                category: category.clone(),
                source: source.clone(),
            }),
            [category, source, slug] => Ok(Route::Post {
                category: category.clone(),
                source: source.clone(),
                slug: slug.clone(),
            }),
            _ => Err(RouteError::TooDeep(trimmed.to_string())),
        }
    }

    /// Canonical path.
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Category { category } => format!("/{}", category),
            Route::CategorySource { category, source } => format!("/{}/{}", category, source),
            Route::Post {
                category,
                source,
                slug,
            } => format!("/{}/{}/{}", category, source, slug),
            Route::Collection { name } => format!("/collections/{}", name),
        }
    }

    /// The feed shown at this route; `None` for detail views.
    pub fn scope(&self) -> Option<FeedScope> {
        match self {
            Route::Home => Some(FeedScope::All),
            Route::Category { category } => Some(FeedScope::Category(category.clone())),
            Route::CategorySource { category, source } => Some(FeedScope::CategorySource {
                category: category.clone(),
                source: source.clone(),
            }),
            Route::Collection { name } => Some(FeedScope::Collection(parse_collection_name(name))),
            Route::Post { .. } => None,
        }
    }

    pub fn is_feed(&self) -> bool {
        !matches!(self, Route::Post { .. })
    }

    /// Only the home feed has a search bar.
    pub fn has_search(&self) -> bool {
        matches!(self, Route::Home)
    }

    /// Short heading for the view.
    pub fn title(&self) -> String {
        match self {
            Route::Home => "Latest".to_string(),
            Route::Category { category } => category.clone(),
            Route::CategorySource { category, source } => format!("{} / {}", category, source),
            Route::Post { slug, .. } => slug.clone(),
            Route::Collection { name } => name.replace(['-', '_'], " "),
        }
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::parse(s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_feed_routes() {
        assert_eq!(Route::parse("/").unwrap(), Route::Home);
        assert_eq!(
            Route::parse("/Funny/").unwrap(),
            Route::Category {
                category: "funny".into()
            }
        );
        assert_eq!(
            Route::parse("/gaming/youtube").unwrap(),
            Route::CategorySource {
                category: "gaming".into(),
                source: "youtube".into()
            }
        );
        assert_eq!(
            Route::parse("/collections/best-of-reddit-2025").unwrap(),
            Route::Collection {
                name: "best-of-reddit-2025".into()
            }
        );
    }

    #[test]
    fn test_parse_detail_route() {
        let route = Route::parse("/funny/reddit/cat-plays-piano?ref=home").unwrap();
        assert_eq!(
            route,
            Route::Post {
                category: "funny".into(),
                source: "reddit".into(),
                slug: "cat-plays-piano".into()
            }
        );
        assert!(!route.is_feed());
        assert_eq!(route.scope(), None);
    }

    #[test]
    fn test_path_is_canonical() {
        for path in ["/", "/news", "/news/x", "/news/x/some-post", "/collections/most-viral"] {
            assert_eq!(Route::parse(path).unwrap().path(), path);
        }
        assert_eq!(Route::parse("//news//x/").unwrap().path(), "/news/x");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Route::parse("news"), Err(RouteError::NotAbsolute(_))));
        assert!(matches!(Route::parse("/a/b/c/d"), Err(RouteError::TooDeep(_))));
        assert!(matches!(Route::parse("/news/<x>"), Err(RouteError::InvalidSegment(_))));
        assert_eq!(Route::parse("/collections"), Err(RouteError::MissingCollection));
    }

    #[test]
    fn test_collection_scope() {
        let route = Route::parse("/collections/funny-x-posts").unwrap();
        let Some(FeedScope::Collection(filters)) = route.scope() else {
            panic!("expected collection scope");
        };
        assert_eq!(filters.source.as_deref(), Some("x"));
        assert_eq!(filters.category.as_deref(), Some("funny"));
    }

    #[test]
    fn test_only_home_has_search() {
        assert!(Route::Home.has_search());
        assert!(!Route::parse("/news").unwrap().has_search());
    }
}
