use crate::config::Config;
use crate::feed::{
    ActiveSequence, DatabaseSearch, Environment, FeedEvent, FeedSession, FeedSettings,
    ListStrategy, ScrollContext, ScrollPositionStore, SearchBackend, SharedViewport,
    SlideDirection, SlideOutcome, Span,
};
use crate::router::Route;
use crate::storage::{Database, FeedScope, Post};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Layout pixels per terminal line.
///
/// The feed core works in layout pixels; the terminal renders one line for
/// every `PX_PER_LINE` of them, so a 450px row is a five-line card.
pub const PX_PER_LINE: f64 = 90.0;

/// Seconds a status message stays visible.
const STATUS_TTL_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Feed,
    Detail,
}

/// State of the detail view.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Loaded(Box<Post>),
    NotFound,
    Failed(String),
}

/// Events from background tasks
#[derive(Debug)]
pub enum AppEvent {
    /// An event from the feed session with this id.
    Feed { session: u64, event: FeedEvent },
    /// The raw feed for a session finished loading.
    ///
    /// Fields:
    /// - `session`: Feed session the load was spawned for (stale detection)
    /// - `result`: Posts newest first, or the error message
    PostsLoaded {
        session: u64,
        result: Result<Vec<Post>, String>,
    },
    /// A detail view's post finished loading.
    DetailLoaded {
        route: Route,
        result: Result<Option<Post>, String>,
    },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub db: Database,
    pub environment: Environment,
    pub settings: FeedSettings,
    pub store: ScrollPositionStore,
    search_backend: Arc<dyn SearchBackend>,
    pub viewport: SharedViewport,
    pub event_tx: mpsc::Sender<AppEvent>,

    /// Current route and the routes to go back to.
    pub route: Route,
    pub history: Vec<Route>,
    pub view: View,

    /// The feed view, kept alive while a detail view is on top of it.
    pub feed: Option<FeedSession<FeedEvent>>,
    feed_route: Option<Route>,
    session_id: u64,
    load_tx: Option<watch::Sender<bool>>,

    /// Selected row within the window.
    pub selected: usize,

    pub detail: DetailState,
    pub detail_scroll: u16,

    pub search_mode: bool,
    pub search_input: String,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub spinner_frame: usize,

    /// Height of the feed viewport in layout pixels, updated on render.
    pub viewport_height: f64,
    /// Viewport offset of the last drawn frame.
    pub drawn_offset: f64,
}

impl App {
    pub fn new(
        db: Database,
        config: &Config,
        environment: Environment,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let mut settings = config.feed_settings();
        // One terminal line per sentinel
        settings.layout.sentinel_height = PX_PER_LINE;
        let search_backend: Arc<dyn SearchBackend> =
            Arc::new(DatabaseSearch::new(db.clone(), config.search_limit));

        Self {
            db,
            environment,
            settings,
            store: ScrollPositionStore::in_memory(),
            search_backend,
            viewport: SharedViewport::new(),
            event_tx,
            route: Route::Home,
            history: Vec::new(),
            view: View::Feed,
            feed: None,
            feed_route: None,
            session_id: 0,
            load_tx: None,
            selected: 0,
            detail: DetailState::Loading,
            detail_scroll: 0,
            search_mode: false,
            search_input: String::new(),
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            viewport_height: 0.0,
            drawn_offset: 0.0,
        }
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Show `route` without recording history (startup).
    pub fn start(&mut self, route: Route) {
        self.enter(route);
    }

    /// Go to `route`, saving the feed position with `context`.
    pub fn navigate(&mut self, route: Route, context: Option<ScrollContext>) {
        self.leave_feed(context);
        let previous = std::mem::replace(&mut self.route, route.clone());
        self.history.push(previous);
        self.enter(route);
    }

    /// Return to the previous route. False when there is none.
    pub fn back(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        self.leave_feed(None);
        self.enter(previous);
        true
    }

    fn leave_feed(&mut self, context: Option<ScrollContext>) {
        if self.view == View::Feed {
            if let Some(feed) = self.feed.as_mut() {
                feed.navigate_away(context);
            }
        }
        self.search_mode = false;
    }

    fn enter(&mut self, route: Route) {
        tracing::debug!(route = %route, "Entering route");
        self.route = route.clone();
        self.needs_redraw = true;

        let Some(scope) = route.scope() else {
            self.view = View::Detail;
            self.detail = DetailState::Loading;
            self.detail_scroll = 0;
            self.spawn_detail_load(route);
            return;
        };

        self.view = View::Feed;
        let reuse = self.feed.is_some() && self.feed_route.as_ref() == Some(&route);
        if !reuse {
            self.open_feed(route.clone(), scope);
        }

        let path = route.path();
        self.selected = self
            .store
            .load(&path)
            .and_then(|record| record.post_index)
            .unwrap_or(0);

        let (load_tx, load_rx) = watch::channel(false);
        self.load_tx = Some(load_tx);
        if let Some(feed) = self.feed.as_mut() {
            feed.arrive(load_rx);
            self.search_input = feed.stage().query().to_string();
        }
    }

    /// Replace the feed session with a fresh one for `route`.
    fn open_feed(&mut self, route: Route, scope: FeedScope) {
        self.session_id = self.session_id.wrapping_add(1);
        let session = self.session_id;

        // Tag feed events with the session they belong to
        let (feed_tx, mut feed_rx) = mpsc::channel::<FeedEvent>(32);
        let app_tx = self.event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = feed_rx.recv().await {
                if app_tx.send(AppEvent::Feed { session, event }).await.is_err() {
                    break;
                }
            }
        });

        self.feed = Some(FeedSession::new(
            route.path(),
            self.environment,
            self.settings,
            Arc::clone(&self.search_backend),
            self.store.clone(),
            self.viewport.clone(),
            feed_tx,
        ));
        self.feed_route = Some(route);

        let db = self.db.clone();
        let tx = self.event_tx.clone();
        tracing::debug!(session, scope = ?scope, "Spawning feed load");
        tokio::spawn(async move {
            let result = db.get_posts(&scope).await.map_err(|e| e.to_string());
            if let Err(e) = tx.send(AppEvent::PostsLoaded { session, result }).await {
                tracing::warn!(error = %e, "Failed to send feed posts (receiver dropped)");
            }
        });
    }

    fn spawn_detail_load(&self, route: Route) {
        let Route::Post {
            category,
            source,
            slug,
        } = route.clone()
        else {
            return;
        };
        let db = self.db.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = db
                .get_post(&category, &source, &slug)
                .await
                .map_err(|e| e.to_string());
            if let Err(e) = tx.send(AppEvent::DetailLoaded { route, result }).await {
                tracing::warn!(error = %e, "Failed to send post (receiver dropped)");
            }
        });
    }

    /// Open the detail view of the selected post.
    pub fn open_selected(&mut self) {
        let Some(feed) = self.feed.as_ref() else {
            return;
        };
        let Some(post) = feed.window().items().get(self.selected) else {
            return;
        };
        let route = Route::Post {
            category: post.category.clone(),
            source: post.source.clone(),
            slug: post.slug.clone(),
        };
        let context = feed.click(self.selected);
        self.navigate(route, Some(context));
    }

    /// Open the category (or category/source) feed of the current post.
    pub fn open_post_feed(&mut self, with_source: bool) {
        let Some(post) = self.current_post() else {
            return;
        };
        let route = if with_source {
            Route::CategorySource {
                category: post.category.clone(),
                source: post.source.clone(),
            }
        } else {
            Route::Category {
                category: post.category.clone(),
            }
        };
        if route == self.route {
            return;
        }
        let context = match self.view {
            View::Feed => self.feed.as_ref().map(|feed| feed.click(self.selected)),
            View::Detail => None,
        };
        self.navigate(route, context);
    }

    /// The selected post in a feed, or the post shown in the detail view.
    pub fn current_post(&self) -> Option<&Post> {
        match (self.view, &self.detail) {
            (View::Feed, _) => self.selected_post(),
            (View::Detail, DetailState::Loaded(post)) => Some(post.as_ref()),
            (View::Detail, _) => None,
        }
    }

    /// Full unload before exit.
    pub fn unload(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            feed.unload();
        }
    }

    // ========================================================================
    // Feed scrolling
    // ========================================================================

    /// Geometry of row `index` for the current strategy.
    pub fn row_span(&self, index: usize) -> Span {
        match self.feed.as_ref() {
            Some(feed) if feed.strategy() == ListStrategy::Virtualized => Span::new(
                feed.virtual_origin() + self.settings.list.row_top(index),
                self.settings.list.row_height,
            ),
            _ => self.settings.layout.row_span(index),
        }
    }

    /// Bound the viewport by the current content height.
    pub fn sync_viewport(&self) {
        if let Some(feed) = self.feed.as_ref() {
            self.viewport
                .set_max_y(feed.content_height() - self.viewport_height);
        }
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.feed.as_ref()?.window().items().get(self.selected)
    }

    fn report_slide(&mut self, outcome: Option<SlideOutcome>) {
        if let Some(SlideOutcome::Started(ticket)) = outcome {
            let msg = match ticket.direction() {
                SlideDirection::Forward => "Loading more posts...",
                SlideDirection::Backward => "Loading previous posts...",
            };
            self.set_status(msg);
        }
    }

    /// Scroll the feed viewport by `dy` pixels.
    pub fn scroll_feed(&mut self, dy: f64) {
        let height = self.viewport_height;
        let outcome = self.feed.as_mut().and_then(|feed| feed.scroll_by(dy, height));
        self.report_slide(outcome);
    }

    /// Move the selection by `delta` rows, scrolling to keep it visible.
    ///
    /// Moving past either end scrolls one line further so the sentinel there
    /// comes into view.
    pub fn move_selection(&mut self, delta: isize) {
        let Some(len) = self.feed.as_ref().map(|f| f.window().items().len()) else {
            return;
        };
        if len == 0 {
            return;
        }
        let target = self.selected as isize + delta;
        if target < 0 {
            self.selected = 0;
            self.scroll_feed(-PX_PER_LINE);
            return;
        }
        if target as usize >= len {
            self.selected = len - 1;
            self.scroll_feed(PX_PER_LINE);
            return;
        }
        self.selected = target as usize;
        self.ensure_selected_visible();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        let y = self.viewport.y();
        self.scroll_feed(-y);
    }

    pub fn select_last(&mut self) {
        if let Some(len) = self.feed.as_ref().map(|f| f.window().items().len()) {
            self.selected = len.saturating_sub(1);
            self.ensure_selected_visible();
        }
    }

    fn ensure_selected_visible(&mut self) {
        let span = self.row_span(self.selected);
        let top = self.viewport.y();
        let bottom = top + self.viewport_height;
        if span.top < top {
            self.scroll_feed(span.top - top);
        } else if span.bottom() > bottom {
            self.scroll_feed(span.bottom() - bottom);
        }
    }

    /// Rows that fit in the viewport.
    pub fn page_rows(&self) -> isize {
        let row_height = self.row_span(0).height;
        if row_height <= 0.0 {
            return 1;
        }
        ((self.viewport_height / row_height).floor() as isize).max(1)
    }

    /// Manual "Load More" / "Load Previous".
    pub fn slide(&mut self, direction: SlideDirection) {
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        match feed.slide(direction) {
            SlideOutcome::AtEdge => self.set_status(match direction {
                SlideDirection::Forward => "No more posts",
                SlideDirection::Backward => "Already at the newest posts",
            }),
            outcome => self.report_slide(Some(outcome)),
        }
    }

    // ========================================================================
    // Search
    // ========================================================================

    pub fn push_search_char(&mut self, c: char) {
        if self.search_input.chars().count() >= crate::util::MAX_SEARCH_QUERY_LENGTH {
            self.set_status(format!(
                "Search query too long (max {} chars)",
                crate::util::MAX_SEARCH_QUERY_LENGTH
            ));
            return;
        }
        self.search_input.push(c);
        self.apply_search();
    }

    pub fn pop_search_char(&mut self) {
        self.search_input.pop();
        self.apply_search();
    }

    pub fn clear_search(&mut self) {
        self.search_input.clear();
        self.apply_search();
    }

    fn apply_search(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            let before = feed.stage().generation();
            feed.set_query(&self.search_input);
            if feed.stage().generation() != before {
                self.selected = 0;
            }
        }
    }

    // ========================================================================
    // Background events
    // ========================================================================

    pub fn on_feed_event(&mut self, session: u64, event: FeedEvent) {
        if session != self.session_id {
            tracing::debug!(session, current = self.session_id, "Ignoring event for closed feed");
            return;
        }
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        let before = feed.window().start();
        let is_search = matches!(event, FeedEvent::SearchCompleted { .. });
        if !feed.handle_event(event) {
            return;
        }
        self.needs_redraw = true;
        self.sync_viewport();
        let Some(feed) = self.feed.as_ref() else {
            return;
        };

        let window = feed.window();
        let after = window.start();
        let len = window.items().len();
        if after > before {
            self.selected = 0;
        } else if after < before {
            self.selected = len.saturating_sub(1);
        } else {
            self.selected = self.selected.min(len.saturating_sub(1));
        }
        if !is_search {
            return;
        }
        if let ActiveSequence::Failed { error, .. } = feed.stage().active() {
            let msg = format!("Search failed: {}", error);
            self.set_status(msg);
        }
    }

    pub fn on_posts_loaded(&mut self, session: u64, result: Result<Vec<Post>, String>) {
        if session != self.session_id {
            tracing::debug!(session, current = self.session_id, "Ignoring posts for closed feed");
            return;
        }
        match result {
            Ok(posts) => {
                tracing::debug!(session, count = posts.len(), "Feed loaded");
                if let Some(feed) = self.feed.as_mut() {
                    feed.load_posts(posts);
                    let len = feed.window().items().len();
                    self.selected = self.selected.min(len.saturating_sub(1));
                }
                self.sync_viewport();
                if let Some(load_tx) = &self.load_tx {
                    // Nobody listening is fine: no restoration was pending
                    let _ = load_tx.send(true);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load feed");
                self.set_status(format!("Failed to load posts: {}", e));
            }
        }
    }

    pub fn on_detail_loaded(&mut self, route: Route, result: Result<Option<Post>, String>) {
        if route != self.route {
            tracing::debug!(route = %route, "Ignoring post for previous route");
            return;
        }
        self.detail = match result {
            Ok(Some(post)) => DetailState::Loaded(Box::new(post)),
            Ok(None) => DetailState::NotFound,
            Err(e) => {
                tracing::warn!(route = %route, error = %e, "Failed to load post");
                DetailState::Failed(e)
            }
        };
    }
}

// ============================================================================
// Tests
// ============================================================================
