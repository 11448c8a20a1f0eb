//! Application event handling.
//!
//! Background tasks (feed loads, debounced searches, settled slides, detail
//! loads) report back through `AppEvent`; this module routes each one to
//! the app state.

use crate::app::{App, AppEvent};

/// Handle application events from background tasks.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Feed { session, event } => app.on_feed_event(session, event),
        AppEvent::PostsLoaded { session, result } => app.on_posts_loaded(session, result),
        AppEvent::DetailLoaded { route, result } => app.on_detail_loaded(route, result),
    }
}
