//! Feed list widget.
//!
//! The window is laid out in layout pixels by the feed core; here every
//! `PX_PER_LINE` pixels become one terminal line. The plain strategy builds
//! every row plus both sentinels, the virtualized one only the rendered range.

use crate::app::{App, PX_PER_LINE};
use crate::feed::{ActiveSequence, FeedEvent, FeedSession, ListStrategy, Row, SlideDirection};
use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::helpers::{placeholder, post_card, spinner};

fn px_to_lines(px: f64) -> usize {
    (px / PX_PER_LINE).round().max(1.0) as usize
}

fn sentinel_line(feed: &FeedSession<FeedEvent>, direction: SlideDirection) -> Line<'static> {
    let window = feed.window();
    let dim = Style::default().fg(Color::DarkGray);
    let text = match direction {
        _ if feed.is_loading(direction) => match direction {
            SlideDirection::Forward => "  Loading more posts...",
            SlideDirection::Backward => "  Loading previous posts...",
        },
        SlideDirection::Forward if window.has_next() => "  ↓ More posts [m]",
        SlideDirection::Forward if !window.items().is_empty() => "  End of feed",
        SlideDirection::Backward if window.has_previous() => "  ↑ Newer posts [p]",
        _ => "",
    };
    Line::from(Span::styled(text, dim))
}

/// Lines for the plain strategy, starting at layout offset 0.
fn plain_lines(app: &App, feed: &FeedSession<FeedEvent>, width: usize) -> Vec<Line<'static>> {
    let layout = feed.settings().layout;
    let row_lines = px_to_lines(layout.row_height);
    let now = Utc::now();

    let mut lines = vec![sentinel_line(feed, SlideDirection::Backward)];
    for (i, post) in feed.window().items().iter().enumerate() {
        lines.extend(post_card(post, i == app.selected, width, row_lines, now));
    }
    lines.push(sentinel_line(feed, SlideDirection::Forward));
    lines
}

/// Lines for the rendered range of the virtualized strategy, and the layout
/// offset of the first one. The backward sentinel line leads when row 0 is
/// rendered.
fn virtual_lines(app: &App, feed: &FeedSession<FeedEvent>, width: usize) -> (Vec<Line<'static>>, f64) {
    let list = feed.settings().list;
    let window = feed.window();
    let len = window.items().len();
    let Some(range) = feed.virtual_range(app.viewport.y(), app.viewport_height) else {
        return (Vec::new(), 0.0);
    };

    let row_lines = px_to_lines(list.row_height);
    let now = Utc::now();
    let mut lines = Vec::with_capacity(range.rendered.len() * row_lines + 1);
    let origin = if range.rendered.start == 0 {
        lines.push(sentinel_line(feed, SlideDirection::Backward));
        0.0
    } else {
        feed.virtual_origin() + list.row_top(range.rendered.start)
    };
    for index in range.rendered.clone() {
        match list.row(index, len, window.has_next()) {
            Some(Row::Post { index }) => {
                lines.extend(post_card(&window.items()[index], index == app.selected, width, row_lines, now));
            }
            Some(Row::Loading) => lines.extend(placeholder("Loading more posts...", row_lines)),
            None => {}
        }
    }
    (lines, origin)
}

fn empty_message(feed: &FeedSession<FeedEvent>) -> Option<String> {
    if !feed.is_loaded() {
        return Some("Loading posts...".to_string());
    }
    match feed.stage().active() {
        ActiveSequence::Pending { query } => Some(format!("Searching for \"{}\"...", query)),
        ActiveSequence::Failed { error, .. } => Some(format!("Search failed: {}", error)),
        ActiveSequence::Results { query, posts } if posts.is_empty() => {
            Some(format!("No posts match \"{}\"", query))
        }
        ActiveSequence::Browse(posts) if posts.is_empty() => Some("No posts yet".to_string()),
        _ => None,
    }
}

fn title(app: &App, feed: &FeedSession<FeedEvent>) -> String {
    let window = feed.window();
    let mut title = format!(" {} ", app.route.title());
    if !window.items().is_empty() {
        title.push_str(&format!(
            "· {}-{} of {} ",
            window.start() + 1,
            window.end(),
            window.sequence_len()
        ));
    }
    if feed.strategy() == ListStrategy::Virtualized {
        title.push_str("· virtual ");
    }
    if !feed.is_loaded() || feed.stage().is_pending() || window.in_flight().is_some() {
        title.push(spinner(app.spinner_frame));
        title.push(' ');
    }
    title
}

/// Render the feed panel
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    // EDGE-001: Borders need at least 3x3
    if area.width < 3 || area.height < 3 {
        return;
    }

    let inner_height = area.height.saturating_sub(2);
    app.viewport_height = f64::from(inner_height) * PX_PER_LINE;
    app.sync_viewport();

    let Some(feed) = app.feed.as_ref() else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title(app, feed));

    if let Some(message) = empty_message(feed) {
        f.render_widget(Paragraph::new(message).block(block), area);
        return;
    }

    let width = area.width.saturating_sub(2) as usize;
    let y = app.viewport.y();
    app.drawn_offset = y;
    let (lines, origin) = match feed.strategy() {
        ListStrategy::Plain => (plain_lines(app, feed, width), 0.0),
        ListStrategy::Virtualized => virtual_lines(app, feed, width),
    };
    let scroll = ((y - origin) / PX_PER_LINE).round().clamp(0.0, f64::from(u16::MAX)) as u16;

    f.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);
}
