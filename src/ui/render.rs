//! Render functions for the TUI.
//!
//! Dispatches to the feed or detail view and draws the status bar below.

use crate::app::{App, View};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::{detail, posts, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    // EDGE-001: Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let show_search = app.view == View::Feed
        && app.route.has_search()
        && (app.search_mode || !app.search_input.is_empty());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(u16::from(show_search)),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    if show_search {
        let cursor = if app.search_mode { "_" } else { "" };
        let line = Line::from(vec![
            Span::styled(" Search: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{}{}", app.search_input, cursor)),
        ]);
        f.render_widget(Paragraph::new(line), chunks[0]);
    }

    match app.view {
        View::Feed => posts::render(f, app, chunks[1]),
        View::Detail => detail::render(f, app, chunks[1]),
    }
    status::render(f, app, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PX_PER_LINE;
    use crate::config::Config;
    use crate::feed::Environment;
    use crate::storage::Database;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        let (tx, _rx) = mpsc::channel(8);
        App::new(db, &Config::default(), Environment::terminal(), tx)
    }

    #[tokio::test]
    async fn test_render_sets_viewport_height() {
        let mut app = test_app().await;
        app.start(crate::router::Route::Home);

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();

        // 24 rows minus status bar minus borders
        assert_eq!(app.viewport_height, 21.0 * PX_PER_LINE);
    }

    #[tokio::test]
    async fn test_small_terminal_shows_message() {
        let mut app = test_app().await;
        let mut terminal = Terminal::new(TestBackend::new(30, 5)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Terminal too small"));
        assert_eq!(app.viewport_height, 0.0);
    }
}
