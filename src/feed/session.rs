//! One feed view.
//!
//! `FeedSession` owns every piece of per-view state: the sort & filter stage,
//! the debounced search, the window, the list strategy, both sentinel
//! triggers and the scroll restorer for the view's path. The UI forwards
//! input and background events to it and renders from its accessors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::list::{ListLayout, ListStrategy, StrategySelector, VirtualList, VirtualRange};
use super::restore::{Readiness, RestoreConfig, RestoreOutcome, ScrollRestorer, SharedViewport, Viewport};
use super::scroll::{ScrollContext, ScrollPositionStore};
use super::search::{SearchBackend, SearchController};
use super::sequence::{ActiveSequence, QueryChange, SortFilterStage};
use super::trigger::{Span, TriggerConfig, VisibilityTrigger};
use super::window::{
    start_for_offset, CommitOutcome, SlideDirection, SlideOutcome, WindowConfig, WindowManager,
    ESTIMATED_ROW_HEIGHT,
};
use super::{Environment, FeedEvent, SEARCH_DEBOUNCE};
use crate::storage::Post;

/// Tunables for a feed view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSettings {
    pub window: WindowConfig,
    pub debounce: Duration,
    pub restore: RestoreConfig,
    pub virtualize: bool,
    pub virtualize_threshold: usize,
    pub virtualize_delay: Duration,
    pub list: VirtualList,
    pub layout: ListLayout,
    pub trigger: TriggerConfig,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            debounce: SEARCH_DEBOUNCE,
            restore: RestoreConfig::default(),
            virtualize: true,
            virtualize_threshold: 10,
            virtualize_delay: Duration::from_millis(1000),
            list: VirtualList::default(),
            layout: ListLayout::default(),
            trigger: TriggerConfig::default(),
        }
    }
}

/// Window start to restore once the sequence is known.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingWindow {
    Start(usize),
    Offset(f64),
}

pub struct FeedSession<E> {
    path: String,
    environment: Environment,
    settings: FeedSettings,
    stage: SortFilterStage,
    search: SearchController,
    window: WindowManager,
    selector: StrategySelector,
    forward: VisibilityTrigger,
    backward: VisibilityTrigger,
    restorer: ScrollRestorer,
    viewport: SharedViewport,
    ready: Arc<AtomicBool>,
    pending_window: Option<PendingWindow>,
    loaded: bool,
    tx: mpsc::Sender<E>,
}

impl<E> FeedSession<E>
where
    E: From<FeedEvent> + Send + 'static,
{
    pub fn new(
        path: impl Into<String>,
        environment: Environment,
        settings: FeedSettings,
        backend: Arc<dyn SearchBackend>,
        store: ScrollPositionStore,
        viewport: SharedViewport,
        tx: mpsc::Sender<E>,
    ) -> Self {
        let restorer = ScrollRestorer::new(
            environment,
            store,
            Arc::new(viewport.clone()),
            settings.restore,
        );
        Self {
            path: path.into(),
            environment,
            settings,
            stage: SortFilterStage::new(),
            search: SearchController::new(backend, settings.debounce),
            window: WindowManager::new(settings.window),
            selector: StrategySelector::new(
                settings.virtualize,
                settings.virtualize_threshold,
                settings.virtualize_delay,
            ),
            forward: VisibilityTrigger::new(settings.trigger),
            backward: VisibilityTrigger::new(settings.trigger),
            restorer,
            viewport,
            ready: Arc::new(AtomicBool::new(false)),
            pending_window: None,
            loaded: false,
            tx,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn window(&self) -> &WindowManager {
        &self.window
    }

    pub fn stage(&self) -> &SortFilterStage {
        &self.stage
    }

    pub fn viewport(&self) -> &SharedViewport {
        &self.viewport
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    pub fn strategy(&self) -> ListStrategy {
        self.selector.strategy()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_loading(&self, direction: SlideDirection) -> bool {
        self.window.is_loading(direction)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Height of the laid-out list for the current strategy.
    pub fn content_height(&self) -> f64 {
        let len = self.window.items().len();
        match self.strategy() {
            ListStrategy::Plain => self.settings.layout.content_height(len),
            ListStrategy::Virtualized => {
                let count = self.settings.list.item_count(len, self.window.has_next());
                self.virtual_origin() + self.settings.list.content_height(count)
            }
        }
    }

    /// Offset of virtualized row 0.
    ///
    /// The backward sentinel stays above the rows in both strategies, so a
    /// row sits at the same offset whichever one is in use and saved scroll
    /// positions survive the switch.
    pub fn virtual_origin(&self) -> f64 {
        self.settings.layout.sentinel_height
    }

    /// Virtualized rows for a viewport at `y` of `height`.
    pub fn virtual_range(&self, y: f64, height: f64) -> Option<VirtualRange> {
        let list = self.settings.list;
        let count = list.item_count(self.window.items().len(), self.window.has_next());
        list.visible_range(y - self.virtual_origin(), height, count)
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Provide the raw feed for this view.
    ///
    /// The first call opens the window (at the restored start when a scroll
    /// record is pending); later calls resync it.
    pub fn load_posts(&mut self, posts: Vec<Post>) {
        let browsing = self.stage.set_source(posts);
        let first = !self.loaded;
        self.loaded = true;

        if browsing {
            if let Some(sequence) = self.stage.sequence() {
                if first {
                    self.window.initialize(sequence);
                } else {
                    self.window.resync(sequence);
                }
            }
        }
        self.apply_pending_window();
        self.after_window_change();
    }

    /// Apply the text of the search input.
    pub fn set_query(&mut self, text: &str) {
        match self.stage.set_query(text) {
            QueryChange::Unchanged => {}
            QueryChange::Cleared => {
                self.search.cancel();
                self.criteria_changed();
            }
            QueryChange::Search { generation, query } => {
                self.search.schedule(generation, query, &self.tx);
                self.criteria_changed();
            }
        }
    }

    fn criteria_changed(&mut self) {
        self.restorer.cancel(&self.path);
        self.pending_window = None;
        match self.stage.sequence() {
            Some(sequence) => self.window.initialize(sequence),
            None => self.window.clear(),
        }
        self.forward.rearm();
        self.backward.rearm();
        self.viewport.scroll_to(0.0, 0.0);
        self.after_window_change();
    }

    /// Handle a background event. Returns true when the view changed.
    pub fn handle_event(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::SearchCompleted {
                generation,
                query,
                result,
            } => {
                if !self.stage.complete_search(generation, query, result) {
                    return false;
                }
                match self.stage.sequence() {
                    Some(sequence) => self.window.initialize(sequence),
                    None => self.window.clear(),
                }
                self.after_window_change();
                true
            }
            FeedEvent::SlideSettled(ticket) => {
                let direction = ticket.direction();
                match self.window.commit(ticket, Instant::now()) {
                    CommitOutcome::Applied { .. } => {
                        // Continue reading from the edge the slide came from
                        match direction {
                            SlideDirection::Forward => self.viewport.scroll_to(0.0, 0.0),
                            SlideDirection::Backward => {
                                self.viewport.scroll_to(0.0, self.viewport.max_y())
                            }
                        }
                        self.after_window_change();
                        true
                    }
                    // The loading indicator goes away either way
                    CommitOutcome::Unchanged => true,
                    CommitOutcome::Stale => false,
                }
            }
            FeedEvent::VirtualizationReady { mount } => {
                self.selector.on_ready(mount, self.window.items().len())
            }
        }
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Request a slide, e.g. from a manual "Load More" affordance.
    pub fn slide(&mut self, direction: SlideDirection) -> SlideOutcome {
        let outcome = self.window.schedule_slide(direction, &self.tx);
        if outcome == SlideOutcome::CoolingDown {
            match direction {
                SlideDirection::Forward => self.forward.rearm(),
                SlideDirection::Backward => self.backward.rearm(),
            }
        }
        outcome
    }

    /// Scroll the viewport by `dy` and let the sentinels react.
    ///
    /// Only the sentinel in the direction of travel may request a slide.
    pub fn scroll_by(&mut self, dy: f64, viewport_height: f64) -> Option<SlideOutcome> {
        self.viewport.scroll_by(dy);
        self.observe_viewport(dy, viewport_height)
    }

    fn observe_viewport(&mut self, dy: f64, viewport_height: f64) -> Option<SlideOutcome> {
        if !self.environment.visibility_observer || viewport_height <= 0.0 {
            return None;
        }
        let busy = self.window.in_flight().is_some();
        let len = self.window.items().len();
        let key = self.window.start();
        let view = Span::new(self.viewport.y(), viewport_height);

        let layout = self.settings.layout;
        let fire_backward = self.backward.observe(
            layout.backward_sentinel(),
            view,
            self.window.has_previous(),
            busy || dy >= 0.0,
            key,
        );

        let fire_forward = match self.strategy() {
            ListStrategy::Plain => self.forward.observe(
                layout.forward_sentinel(len),
                view,
                self.window.has_next(),
                busy || dy <= 0.0,
                key,
            ),
            ListStrategy::Virtualized => {
                let has_next = self.window.has_next();
                dy > 0.0
                    && self
                        .virtual_range(view.top, view.height)
                        .is_some_and(|range| {
                            self.settings.list.should_load_more(&range, len, has_next, busy)
                        })
            }
        };

        if fire_forward {
            Some(self.slide(SlideDirection::Forward))
        } else if fire_backward {
            Some(self.slide(SlideDirection::Backward))
        } else {
            None
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Context for the post at `index` within the window, to pass along when
    /// navigating away.
    pub fn click(&self, index: usize) -> ScrollContext {
        ScrollContext::now(index, self.window.start())
    }

    /// Leave this view. Pending search and slide work is abandoned.
    pub fn navigate_away(&mut self, context: Option<ScrollContext>) {
        self.search.cancel();
        self.window.abandon_slide();
        self.restorer.on_navigate_away(&self.path, context);
    }

    /// (Re-)enter this view and start restoring its scroll position.
    pub fn arrive(&mut self, load: watch::Receiver<bool>) {
        self.selector.remount();
        self.forward.rearm();
        self.backward.rearm();
        self.viewport.scroll_to(0.0, 0.0);

        self.pending_window = self
            .restorer
            .store()
            .load(&self.path)
            .filter(|record| record.y > 0.0)
            .map(|record| match record.context() {
                Some((_, start)) => PendingWindow::Start(start),
                None => PendingWindow::Offset(record.y),
            });

        if let ActiveSequence::Pending { query } = self.stage.active() {
            let query = query.clone();
            self.search.schedule(self.stage.generation(), query, &self.tx);
        }

        self.apply_pending_window();
        self.after_window_change();

        let ready = Arc::clone(&self.ready);
        let readiness: Readiness = Arc::new(move || ready.load(Ordering::SeqCst));
        self.restorer.on_arrive(&self.path, readiness, load);
    }

    /// Full unload (application exit): the record for this path is dropped.
    pub fn unload(&mut self) {
        self.search.cancel();
        self.window.abandon_slide();
        self.restorer.on_unload();
    }

    /// Wait for the scroll restoration started by [`arrive`](Self::arrive).
    pub async fn restored(&mut self) -> Option<RestoreOutcome> {
        let path = self.path.clone();
        self.restorer.finish(&path).await
    }

    fn apply_pending_window(&mut self) {
        if !self.loaded {
            return;
        }
        let Some(sequence) = self.stage.sequence() else {
            return;
        };
        let Some(pending) = self.pending_window.take() else {
            return;
        };
        let start = match pending {
            PendingWindow::Start(start) => start,
            PendingWindow::Offset(y) => start_for_offset(
                y,
                ESTIMATED_ROW_HEIGHT,
                sequence.len(),
                self.settings.window.size,
            ),
        };
        tracing::debug!(path = %self.path, start, "Restoring window");
        self.window.initialize_at(sequence, start);
    }

    fn after_window_change(&mut self) {
        let len = self.window.items().len();
        self.ready
            .store(self.pending_window.is_none() && len > 0, Ordering::SeqCst);
        self.selector.hydrate(self.environment.interactive, len, &self.tx);
    }
}
