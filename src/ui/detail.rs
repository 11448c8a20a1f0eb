use crate::app::{App, DetailState};
use crate::util::strip_control_chars;
use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::helpers::{post_meta, spinner};

/// Render the post detail view
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    // EDGE-001: Guard against zero-width/height areas
    if area.width < 3 || area.height < 3 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", app.route.path()));

    let post = match &app.detail {
        DetailState::Loaded(post) => post,
        DetailState::Loading => {
            let text = format!("{} Loading post...", spinner(app.spinner_frame));
            f.render_widget(Paragraph::new(text).block(block), area);
            return;
        }
        DetailState::NotFound => {
            f.render_widget(Paragraph::new("Post not found").block(block), area);
            return;
        }
        DetailState::Failed(error) => {
            let text = Span::styled(
                format!("Failed to load post: {}", error),
                Style::default().fg(Color::Red),
            );
            f.render_widget(Paragraph::new(text).block(block), area);
            return;
        }
    };

    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            strip_control_chars(&post.title).into_owned(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(post_meta(post, Utc::now()), dim)),
        Line::from(""),
    ];
    lines.extend(
        strip_control_chars(&post.description)
            .lines()
            .map(|l| Line::from(l.to_string())),
    );

    let links = [
        ("Link", &post.address),
        ("Image", &post.image),
        ("Video", &post.video),
    ];
    if links.iter().any(|(_, url)| url.is_some()) {
        lines.push(Line::from(""));
    }
    for (label, url) in links {
        if let Some(url) = url {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<6}", label), dim),
                Span::styled(url.clone(), Style::default().fg(Color::Cyan)),
            ]));
        }
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    f.render_widget(paragraph, area);
}
