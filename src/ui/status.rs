use crate::app::{App, View};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    // EDGE-001: Guard against zero-width/height areas
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.search_mode {
        Cow::Borrowed("Type to search | ESC clear | ENTER done")
    } else {
        match app.view {
            View::Feed if app.route.has_search() => Cow::Borrowed(
                "[j/k]move [Enter]open [/]search [c]ategory [s]ource [m]ore [p]rev [o]pen link [q]uit",
            ),
            View::Feed => Cow::Borrowed(
                "[j/k]move [Enter]open [c]ategory [s]ource [m]ore [p]rev [o]pen link [b]ack [q]uit",
            ),
            View::Detail => Cow::Borrowed("[b]ack [j/k]scroll [o]pen link [c]ategory [s]ource [q]uit"),
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}
