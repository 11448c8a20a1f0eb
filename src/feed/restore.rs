//! Scroll restoration.
//!
//! Leaving a path saves the viewport position (plus any window context) in
//! the [`ScrollPositionStore`]. Arriving at a path with a saved, non-zero
//! position spawns one restoring task that waits for the readiness predicate,
//! applies the position and retries a bounded number of times while the
//! viewport has not reached it. A one-shot load signal re-applies the target.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::scroll::{ScrollContext, ScrollPositionStore};
use super::Environment;

/// Something that can be scrolled.
pub trait Viewport: Send + Sync {
    fn scroll_to(&self, x: f64, y: f64);
    fn scroll_position(&self) -> (f64, f64);
}

/// Readiness predicate polled before each restore attempt.
pub type Readiness = Arc<dyn Fn() -> bool + Send + Sync>;

/// A predicate that is always ready.
pub fn always_ready() -> Readiness {
    Arc::new(|| true)
}

#[derive(Debug, Default)]
struct ViewportState {
    x: f64,
    y: f64,
    max_y: f64,
}

/// Viewport position shared between the UI and restoring tasks.
///
/// Scrolling is clamped to `[0, max_y]`, where `max_y` is updated by the
/// renderer once it knows the content height.
#[derive(Debug, Clone, Default)]
pub struct SharedViewport {
    state: Arc<Mutex<ViewportState>>,
}

impl SharedViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_max_y(&self, max_y: f64) {
        let mut state = self.state.lock();
        state.max_y = max_y.max(0.0);
        state.y = state.y.min(state.max_y);
    }

    pub fn max_y(&self) -> f64 {
        self.state.lock().max_y
    }

    pub fn scroll_by(&self, dy: f64) {
        let mut state = self.state.lock();
        state.y = (state.y + dy).clamp(0.0, state.max_y);
    }

    pub fn y(&self) -> f64 {
        self.state.lock().y
    }
}

impl Viewport for SharedViewport {
    fn scroll_to(&self, x: f64, y: f64) {
        let mut state = self.state.lock();
        state.x = x.max(0.0);
        state.y = y.clamp(0.0, state.max_y);
    }

    fn scroll_position(&self) -> (f64, f64) {
        let state = self.state.lock();
        (state.x, state.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestoreState {
    #[default]
    Unsaved,
    Saved,
    Restoring,
    Restored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The viewport reached the target after this many retries.
    Applied { retries: u32 },
    /// Attempts ran out. Tolerated silently.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_millis(300),
        }
    }
}

/// Positions closer than this count as reached.
const POSITION_TOLERANCE: f64 = 0.5;

pub struct ScrollRestorer {
    enabled: bool,
    store: ScrollPositionStore,
    viewport: Arc<dyn Viewport>,
    config: RestoreConfig,
    states: Arc<Mutex<HashMap<String, RestoreState>>>,
    tasks: HashMap<String, JoinHandle<RestoreOutcome>>,
    current: Option<String>,
}

impl ScrollRestorer {
    pub fn new(
        environment: Environment,
        store: ScrollPositionStore,
        viewport: Arc<dyn Viewport>,
        config: RestoreConfig,
    ) -> Self {
        Self {
            enabled: environment.manual_scroll_restoration,
            store,
            viewport,
            config,
            states: Arc::new(Mutex::new(HashMap::new())),
            tasks: HashMap::new(),
            current: None,
        }
    }

    pub fn store(&self) -> &ScrollPositionStore {
        &self.store
    }

    pub fn state(&self, path: &str) -> RestoreState {
        self.states.lock().get(path).copied().unwrap_or_default()
    }

    fn set_state(&self, path: &str, state: RestoreState) {
        self.states.lock().insert(path.to_string(), state);
    }

    /// Save the viewport position for `path` before navigating away.
    pub fn on_navigate_away(&mut self, path: &str, context: Option<ScrollContext>) {
        self.cancel(path);
        if !self.enabled {
            return;
        }
        let (x, y) = self.viewport.scroll_position();
        self.store.save(path, x, y, context);
        self.set_state(path, RestoreState::Saved);
    }

    /// Start restoring `path` after arriving at it.
    ///
    /// `load` is the full resource-load signal; the first transition to
    /// `true` after arrival re-applies the target once.
    pub fn on_arrive(&mut self, path: &str, readiness: Readiness, load: watch::Receiver<bool>) -> RestoreState {
        self.current = Some(path.to_string());
        self.cancel(path);

        let record = if self.enabled { self.store.load(path) } else { None };
        let Some(record) = record.filter(|r| r.y != 0.0) else {
            self.set_state(path, RestoreState::Restored);
            return RestoreState::Restored;
        };

        self.set_state(path, RestoreState::Restoring);
        tracing::debug!(path, y = record.y, "Restoring scroll position");

        let viewport = Arc::clone(&self.viewport);
        let states = Arc::clone(&self.states);
        let config = self.config;
        let owned_path = path.to_string();
        let (x, y) = (record.x, record.y);

        let handle = tokio::spawn(async move {
            let retries = async {
                let outcome = retry_scroll(viewport.as_ref(), &readiness, config, x, y).await;
                states.lock().insert(owned_path.clone(), RestoreState::Restored);
                match outcome {
                    RestoreOutcome::Applied { retries } => {
                        tracing::debug!(path = %owned_path, retries, "Scroll position restored")
                    }
                    RestoreOutcome::TimedOut => {
                        tracing::debug!(path = %owned_path, "Scroll restoration timed out")
                    }
                }
                outcome
            };
            let listener = async {
                if wait_for_load(load).await {
                    viewport.scroll_to(x, y);
                }
            };
            let (outcome, ()) = tokio::join!(retries, listener);
            outcome
        });
        self.tasks.insert(path.to_string(), handle);
        RestoreState::Restoring
    }

    /// Full unload: forget the current path's record and stop all work.
    pub fn on_unload(&mut self) {
        self.cancel_all();
        if let Some(path) = self.current.take() {
            self.store.remove(&path);
            self.set_state(&path, RestoreState::Unsaved);
            tracing::debug!(path = %path, "Cleared scroll position on unload");
        }
    }

    /// Abort the restoring task for `path`, if any.
    pub fn cancel(&mut self, path: &str) {
        if let Some(handle) = self.tasks.remove(path) {
            handle.abort();
            tracing::debug!(path, "Aborted scroll restoration");
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    /// Wait for the restoring task of `path` to end.
    ///
    /// Resolves once the retries are over and the load signal has either fired
    /// or been dropped. `None` if no task was running or it was aborted.
    pub async fn finish(&mut self, path: &str) -> Option<RestoreOutcome> {
        let handle = self.tasks.remove(path)?;
        handle.await.ok()
    }
}

impl Drop for ScrollRestorer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn retry_scroll(
    viewport: &dyn Viewport,
    readiness: &Readiness,
    config: RestoreConfig,
    x: f64,
    y: f64,
) -> RestoreOutcome {
    let mut attempts = 0;
    loop {
        if readiness() {
            viewport.scroll_to(x, y);
            let (_, current) = viewport.scroll_position();
            if (current - y).abs() < POSITION_TOLERANCE {
                return RestoreOutcome::Applied { retries: attempts };
            }
        }
        if attempts >= config.max_attempts {
            return RestoreOutcome::TimedOut;
        }
        attempts += 1;
        tracing::trace!(attempts, "Scroll restore not yet possible, retrying");
        tokio::time::sleep(config.interval).await;
    }
}

/// True on the first transition to loaded; false if the signal is dropped.
async fn wait_for_load(mut load: watch::Receiver<bool>) -> bool {
    while load.changed().await.is_ok() {
        if *load.borrow_and_update() {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Viewport that records every scroll call.
    #[derive(Default)]
    struct RecordingViewport {
        inner: SharedViewport,
        calls: Mutex<Vec<(f64, f64)>>,
    }

    impl RecordingViewport {
        fn with_max(max_y: f64) -> Arc<Self> {
            let viewport = Self::default();
            viewport.inner.set_max_y(max_y);
            Arc::new(viewport)
        }
    }

    impl Viewport for RecordingViewport {
        fn scroll_to(&self, x: f64, y: f64) {
            self.calls.lock().push((x, y));
            self.inner.scroll_to(x, y);
        }

        fn scroll_position(&self) -> (f64, f64) {
            self.inner.scroll_position()
        }
    }

    fn restorer(viewport: Arc<RecordingViewport>) -> ScrollRestorer {
        ScrollRestorer::new(
            Environment::terminal(),
            ScrollPositionStore::in_memory(),
            viewport,
            RestoreConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_scrolls_once() {
        let viewport = RecordingViewport::with_max(10_000.0);
        let mut restorer = restorer(viewport.clone());

        viewport.inner.scroll_to(0.0, 1234.0);
        restorer.on_navigate_away("/", Some(ScrollContext::now(3, 40)));
        assert_eq!(restorer.state("/"), RestoreState::Saved);

        viewport.inner.scroll_to(0.0, 0.0);
        let (load_tx, load_rx) = watch::channel(false);
        assert_eq!(restorer.on_arrive("/", always_ready(), load_rx), RestoreState::Restoring);
        drop(load_tx);

        let outcome = restorer.finish("/").await;
        assert_eq!(outcome, Some(RestoreOutcome::Applied { retries: 0 }));
        assert_eq!(*viewport.calls.lock(), vec![(0.0, 1234.0)]);
        assert_eq!(restorer.state("/"), RestoreState::Restored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_readiness() {
        let viewport = RecordingViewport::with_max(10_000.0);
        let mut restorer = restorer(viewport.clone());
        restorer.store().save("/", 0.0, 900.0, None);

        let ready = Arc::new(AtomicBool::new(false));
        let flag = ready.clone();
        let readiness: Readiness = Arc::new(move || flag.load(Ordering::SeqCst));

        let (load_tx, load_rx) = watch::channel(false);
        restorer.on_arrive("/", readiness, load_rx);
        drop(load_tx);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(viewport.calls.lock().is_empty());
        assert_eq!(restorer.state("/"), RestoreState::Restoring);

        ready.store(true, Ordering::SeqCst);
        let outcome = restorer.finish("/").await;
        assert!(matches!(outcome, Some(RestoreOutcome::Applied { .. })));
        assert_eq!(viewport.inner.y(), 900.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_content_too_short() {
        // Content never grows tall enough to reach the target
        let viewport = RecordingViewport::with_max(100.0);
        let mut restorer = restorer(viewport.clone());
        restorer.store().save("/", 0.0, 900.0, None);

        let (load_tx, load_rx) = watch::channel(false);
        restorer.on_arrive("/", always_ready(), load_rx);
        drop(load_tx);

        let outcome = restorer.finish("/").await;
        assert_eq!(outcome, Some(RestoreOutcome::TimedOut));
        assert_eq!(viewport.calls.lock().len(), 31);
        assert_eq!(restorer.state("/"), RestoreState::Restored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_signal_reapplies_target() {
        let viewport = RecordingViewport::with_max(10_000.0);
        let mut restorer = restorer(viewport.clone());
        restorer.store().save("/", 0.0, 500.0, None);

        let (load_tx, load_rx) = watch::channel(false);
        restorer.on_arrive("/", always_ready(), load_rx);
        load_tx.send(true).unwrap();

        restorer.finish("/").await;
        assert_eq!(*viewport.calls.lock(), vec![(0.0, 500.0), (0.0, 500.0)]);
    }

    #[tokio::test]
    async fn test_no_record_or_top_is_restored_immediately() {
        let viewport = RecordingViewport::with_max(10_000.0);
        let mut restorer = restorer(viewport.clone());

        let (_tx, rx) = watch::channel(false);
        assert_eq!(restorer.on_arrive("/", always_ready(), rx.clone()), RestoreState::Restored);

        restorer.store().save("/", 0.0, 0.0, None);
        assert_eq!(restorer.on_arrive("/", always_ready(), rx), RestoreState::Restored);
        assert!(viewport.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unload_clears_record() {
        let viewport = RecordingViewport::with_max(10_000.0);
        let mut restorer = restorer(viewport.clone());
        restorer.store().save("/", 0.0, 700.0, None);

        let (_tx, rx) = watch::channel(false);
        restorer.on_arrive("/", always_ready(), rx.clone());
        restorer.on_unload();

        assert_eq!(restorer.store().load("/"), None);
        assert_eq!(restorer.state("/"), RestoreState::Unsaved);

        // A fresh arrival starts at the top
        viewport.inner.scroll_to(0.0, 0.0);
        viewport.calls.lock().clear();
        assert_eq!(restorer.on_arrive("/", always_ready(), rx), RestoreState::Restored);
        assert!(viewport.calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_arrival_aborts_previous_task() {
        let viewport = RecordingViewport::with_max(10_000.0);
        let mut restorer = restorer(viewport.clone());
        restorer.store().save("/", 0.0, 800.0, None);

        let never: Readiness = Arc::new(|| false);
        let (_tx, rx) = watch::channel(false);
        restorer.on_arrive("/", never, rx.clone());
        let (tx2, rx2) = watch::channel(false);
        restorer.on_arrive("/", always_ready(), rx2);
        drop(tx2);

        assert_eq!(restorer.finish("/").await, Some(RestoreOutcome::Applied { retries: 0 }));
    }

    #[test]
    fn test_headless_does_not_save() {
        let viewport = RecordingViewport::with_max(10_000.0);
        let mut restorer = ScrollRestorer::new(
            Environment::headless(),
            ScrollPositionStore::in_memory(),
            viewport.clone(),
            RestoreConfig::default(),
        );
        viewport.inner.scroll_to(0.0, 300.0);
        restorer.on_navigate_away("/", None);
        assert_eq!(restorer.store().load("/"), None);
        assert_eq!(restorer.state("/"), RestoreState::Unsaved);
    }

    #[test]
    fn test_shared_viewport_clamps() {
        let viewport = SharedViewport::new();
        viewport.set_max_y(500.0);
        viewport.scroll_to(0.0, 800.0);
        assert_eq!(viewport.y(), 500.0);
        viewport.scroll_by(-600.0);
        assert_eq!(viewport.y(), 0.0);
        viewport.scroll_to(0.0, 400.0);
        viewport.set_max_y(100.0);
        assert_eq!(viewport.y(), 100.0);
    }
}
