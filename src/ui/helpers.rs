//! Shared formatting for post cards and the detail view.

use crate::storage::Post;
use crate::util::{strip_control_chars, truncate_to_width};
use chrono::{DateTime, Utc};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub(super) fn spinner(frame: usize) -> char {
    SPINNER[frame % SPINNER.len()]
}

/// Format a creation time relative to `now`.
pub(super) fn format_relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - created_at).num_seconds();

    // Future timestamps and the last minute
    if diff < 60 {
        return "now".to_string();
    }
    if diff < 3600 {
        return format!("{}m", diff / 60);
    }
    if diff < 86400 {
        return format!("{}h", diff / 3600);
    }
    if diff < 604800 {
        return format!("{}d", diff / 86400);
    }
    created_at.format("%b %d").to_string()
}

/// One-line metadata summary: `category / source · r/sub · ▲ 12 · 3h`.
pub(super) fn post_meta(post: &Post, now: DateTime<Utc>) -> String {
    let mut parts = vec![format!("{} / {}", post.category, post.source)];
    if let Some(sub) = &post.subreddit {
        parts.push(format!("r/{}", sub));
    }
    if let Some(upvotes) = post.upvotes {
        parts.push(format!("▲ {}", upvotes));
    }
    parts.push(format_relative_time(post.created_at, now));
    parts.join(" · ")
}

/// Media markers for a card.
fn media_line(post: &Post) -> String {
    let mut markers = Vec::new();
    if post.image.is_some() {
        markers.push("[image]");
    }
    if post.video.is_some() {
        markers.push("[video]");
    }
    if post.address.is_some() {
        markers.push("[link]");
    }
    markers.join(" ")
}

/// Lay out a post as a card of exactly `height` lines.
pub(super) fn post_card(
    post: &Post,
    selected: bool,
    width: usize,
    height: usize,
    now: DateTime<Utc>,
) -> Vec<Line<'static>> {
    let marker = if selected { "▌ " } else { "  " };
    let inner = width.saturating_sub(2);
    let title_style = if selected {
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let dim = Style::default().fg(Color::DarkGray);

    let title = strip_control_chars(&post.title);
    let description = strip_control_chars(&post.description);
    let description = description.lines().next().unwrap_or_default();

    let mut lines = vec![
        Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Cyan)),
            Span::styled(truncate_to_width(&title, inner).into_owned(), title_style),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(truncate_to_width(&post_meta(post, now), inner).into_owned(), dim),
        ]),
        Line::from(format!("  {}", truncate_to_width(description, inner))),
        Line::from(Span::styled(format!("  {}", media_line(post)), Style::default().fg(Color::Yellow))),
    ];
    lines.resize(height, Line::from(""));
    lines
}

/// A placeholder block of `height` lines with `text` on the first.
pub(super) fn placeholder(text: &str, height: usize) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("  {}", text),
        Style::default().fg(Color::DarkGray),
    ))];
    lines.resize(height.max(1), Line::from(""));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn post() -> Post {
        Post {
            id: "abc".into(),
            title: "Cat plays piano".into(),
            image: Some("https://example.com/cat.jpg".into()),
            video: None,
            description: "A cat\nwith talent".into(),
            slug: "cat-plays-piano".into(),
            category: "funny".into(),
            source: "reddit".into(),
            subreddit: Some("aww".into()),
            upvotes: Some(42),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            address: None,
        }
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(format_relative_time(now, now), "now");
        assert_eq!(format_relative_time(now + Duration::minutes(5), now), "now");
        assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5m");
        assert_eq!(format_relative_time(now - Duration::hours(3), now), "3h");
        assert_eq!(format_relative_time(now - Duration::days(2), now), "2d");
        assert_eq!(format_relative_time(now - Duration::days(30), now), "Oct 15");
    }

    #[test]
    fn test_post_meta() {
        let post = post();
        let now = post.created_at + Duration::hours(1);
        assert_eq!(post_meta(&post, now), "funny / reddit · r/aww · ▲ 42 · 1h");
    }

    #[test]
    fn test_card_has_requested_height() {
        let post = post();
        let now = post.created_at;
        assert_eq!(post_card(&post, false, 40, 5, now).len(), 5);
        assert_eq!(post_card(&post, true, 40, 2, now).len(), 2);
        assert_eq!(placeholder("Loading...", 3).len(), 3);
    }
}
