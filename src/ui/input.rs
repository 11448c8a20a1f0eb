//! Input handling for the TUI.
//!
//! This module processes keyboard input and dispatches to the appropriate
//! handler based on current view and mode.

use crate::app::{App, View, PX_PER_LINE};
use crate::feed::SlideDirection;
use crate::util::validate_url_for_open;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};

use super::Action;

const ERR_POST_NO_LINK: &str = "Post has no link";

/// Main input dispatch function.
pub(super) fn handle_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<Action> {
    if app.search_mode {
        return Ok(handle_search_input(app, code));
    }

    // Shared between views
    match code {
        KeyCode::Char('q') => return Ok(Action::Quit),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(Action::Quit),
        KeyCode::Char('o') => {
            open_current_link(app);
            return Ok(Action::Continue);
        }
        KeyCode::Char('c') => {
            app.open_post_feed(false);
            return Ok(Action::Continue);
        }
        KeyCode::Char('s') => {
            app.open_post_feed(true);
            return Ok(Action::Continue);
        }
        KeyCode::Char('b') | KeyCode::Backspace => {
            if !app.back() {
                app.set_status("Nothing to go back to");
            }
            return Ok(Action::Continue);
        }
        _ => {}
    }

    match app.view {
        View::Feed => handle_feed_input(app, code, modifiers),
        View::Detail => handle_detail_input(app, code, modifiers),
    }
    Ok(Action::Continue)
}

fn handle_feed_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::Char('d') if ctrl => app.move_selection(app.page_rows() / 2 + 1),
        KeyCode::Char('u') if ctrl => app.move_selection(-(app.page_rows() / 2 + 1)),
        KeyCode::PageDown => app.move_selection(app.page_rows()),
        KeyCode::PageUp => app.move_selection(-app.page_rows()),
        KeyCode::Char('J') => app.scroll_feed(PX_PER_LINE),
        KeyCode::Char('K') => app.scroll_feed(-PX_PER_LINE),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Enter | KeyCode::Char('l') => app.open_selected(),
        KeyCode::Char('m') => app.slide(SlideDirection::Forward),
        KeyCode::Char('p') => app.slide(SlideDirection::Backward),
        KeyCode::Char('/') => {
            if app.route.has_search() {
                app.search_mode = true;
            } else {
                app.set_status("Search is only available on the home feed");
            }
        }
        KeyCode::Esc => {
            if !app.search_input.is_empty() {
                app.clear_search();
            } else if !app.back() {
                app.set_status("Press q to quit");
            }
        }
        _ => {}
    }
}

fn handle_detail_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Char('j') | KeyCode::Down => {
            app.detail_scroll = app.detail_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.detail_scroll = app.detail_scroll.saturating_sub(1);
        }
        KeyCode::Char('d') if ctrl => app.detail_scroll = app.detail_scroll.saturating_add(10),
        KeyCode::Char('u') if ctrl => app.detail_scroll = app.detail_scroll.saturating_sub(10),
        KeyCode::Char('g') => app.detail_scroll = 0,
        KeyCode::Esc | KeyCode::Char('h') => {
            app.back();
        }
        _ => {}
    }
}

/// Handle input while typing a search query.
fn handle_search_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc => {
            app.search_mode = false;
            app.clear_search();
        }
        KeyCode::Enter => app.search_mode = false,
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Char(c) => app.push_search_char(c),
        _ => {}
    }
    Action::Continue
}

fn open_current_link(app: &mut App) {
    let Some(post) = app.current_post() else {
        return;
    };
    let Some(url) = post.address.clone().or_else(|| post.video.clone()) else {
        app.set_status(ERR_POST_NO_LINK);
        return;
    };
    // SEC: Validate URL before open::that() to prevent command injection
    match validate_url_for_open(&url) {
        Err(e) => app.set_status(e),
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                app.set_status(format!("Failed to open browser: {}", e));
            }
        }
    }
}
