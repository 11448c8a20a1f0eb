//! Collection names to feed filters.
//!
//! A collection is a named view such as `best-of-reddit-2025` or
//! `funny-x-posts-july-2025`. The name is split on `-` and each token may
//! select a source, a category or part of a date range. When several tokens
//! of the same kind appear the last one wins.

use chrono::{TimeZone, Utc};

use super::types::CollectionFilters;

const SOURCES: &[&str] = &["reddit", "x", "youtube"];

const CATEGORIES: &[&str] = &[
    "technology",
    "news",
    "sports",
    "entertainment",
    "music",
    "gaming",
    "funny",
    "lifestyle",
    "business",
];

/// Tokens that map onto the `trending` category.
const TRENDING_ALIASES: &[&str] = &["trending", "viral"];

const MONTHS: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parse a collection name into filters.
pub fn parse_collection_name(name: &str) -> CollectionFilters {
    let lower = name.to_lowercase();
    let mut filters = CollectionFilters {
        name: lower.clone(),
        ..Default::default()
    };
    let mut month: Option<u32> = None;
    let mut year: Option<i32> = None;

    for token in lower.split(|c: char| c == '-' || c == '_' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        if SOURCES.contains(&token) {
            filters.source = Some(token.to_string());
        } else if CATEGORIES.contains(&token) {
            filters.category = Some(token.to_string());
        } else if TRENDING_ALIASES.contains(&token) {
            filters.category = Some("trending".to_string());
        }

        // "july2025" carries both a month and a year
        for (index, m) in MONTHS.iter().enumerate() {
            if token.starts_with(m) {
                month = Some(index as u32 + 1);
            }
        }
        if let Some(found) = find_year(token) {
            year = Some(found);
        }
    }

    filters.created_between = date_range(month, year);
    filters
}

/// First `20xx` run of digits in a token.
fn find_year(token: &str) -> Option<i32> {
    let bytes = token.as_bytes();
    bytes.windows(4).enumerate().find_map(|(start, window)| {
        let is_year = window[0] == b'2' && window[1] == b'0' && window.iter().all(u8::is_ascii_digit);
        let bounded = start + 4 == bytes.len() || !bytes[start + 4].is_ascii_digit();
        if is_year && bounded {
            std::str::from_utf8(window).ok()?.parse().ok()
        } else {
            None
        }
    })
}

/// Half-open millisecond range; a month without a year does not filter.
fn date_range(month: Option<u32>, year: Option<i32>) -> Option<(i64, i64)> {
    let year = year?;
    let (start, end) = match month {
        Some(12) => (
            Utc.with_ymd_and_hms(year, 12, 1, 0, 0, 0).single()?,
            Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?,
        ),
        Some(m) => (
            Utc.with_ymd_and_hms(year, m, 1, 0, 0, 0).single()?,
            Utc.with_ymd_and_hms(year, m + 1, 1, 0, 0, 0).single()?,
        ),
        None => (
            Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?,
            Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?,
        ),
    };
    Some((start.timestamp_millis(), end.timestamp_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn millis(y: i32, m: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).unwrap().timestamp_millis()
    }

    #[test]
    fn test_source_and_year() {
        let filters = parse_collection_name("best-of-reddit-2025");
        assert_eq!(filters.source.as_deref(), Some("reddit"));
        assert_eq!(filters.category, None);
        assert_eq!(
            filters.created_between,
            Some((millis(2025, 1), millis(2026, 1)))
        );
    }

    #[test]
    fn test_month_glued_to_year() {
        let filters = parse_collection_name("most-viral-content-july2025");
        assert_eq!(filters.category.as_deref(), Some("trending"));
        assert_eq!(
            filters.created_between,
            Some((millis(2025, 7), millis(2025, 8)))
        );
    }

    #[test]
    fn test_december_rolls_over() {
        let filters = parse_collection_name("gaming-youtube-december-2024");
        assert_eq!(filters.source.as_deref(), Some("youtube"));
        assert_eq!(filters.category.as_deref(), Some("gaming"));
        assert_eq!(
            filters.created_between,
            Some((millis(2024, 12), millis(2025, 1)))
        );
    }

    #[test]
    fn test_x_is_a_whole_token() {
        let filters = parse_collection_name("funny-x-posts");
        assert_eq!(filters.source.as_deref(), Some("x"));
        assert_eq!(filters.category.as_deref(), Some("funny"));

        // "xbox" or "next" must not select the x source
        let filters = parse_collection_name("next-xbox-news");
        assert_eq!(filters.source, None);
        assert_eq!(filters.category.as_deref(), Some("news"));
    }

    #[test]
    fn test_month_without_year_does_not_filter() {
        let filters = parse_collection_name("funnies-reddit-posts-july");
        assert_eq!(filters.created_between, None);
    }

    #[test]
    fn test_unknown_name_has_no_filters() {
        let filters = parse_collection_name("Editors-Picks");
        assert_eq!(filters.name, "editors-picks");
        assert_eq!(filters.source, None);
        assert_eq!(filters.category, None);
        assert_eq!(filters.created_between, None);
    }
}
