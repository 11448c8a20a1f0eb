//! List strategies.
//!
//! Both strategies consume the same window and the same forward-pagination
//! contract. The plain list lays out every window item and relies on the
//! sentinels (or a manual "Load More") to slide; the virtualized list only
//! produces the rows near the viewport and requests more when an unloaded
//! index approaches the rendered range.

use std::ops::Range;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::trigger::Span;
use super::FeedEvent;

/// Height reserved for each sentinel row in the plain layout.
pub const SENTINEL_HEIGHT: f64 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListStrategy {
    #[default]
    Plain,
    Virtualized,
}

/// Decides when a mounted list switches from plain to virtualized.
///
/// The switch happens once per mount, after hydration plus a settle delay,
/// and only for sequences longer than the threshold. It never goes back.
pub struct StrategySelector {
    enabled: bool,
    threshold: usize,
    delay: Duration,
    mount: u64,
    strategy: ListStrategy,
    armed_for: Option<usize>,
    handle: Option<JoinHandle<()>>,
}

impl StrategySelector {
    pub fn new(enabled: bool, threshold: usize, delay: Duration) -> Self {
        Self {
            enabled,
            threshold,
            delay,
            mount: 0,
            strategy: ListStrategy::Plain,
            armed_for: None,
            handle: None,
        }
    }

    pub fn strategy(&self) -> ListStrategy {
        self.strategy
    }

    pub fn mount(&self) -> u64 {
        self.mount
    }

    /// Start (or restart, when the length changed) the settle timer.
    ///
    /// Called after hydration and again whenever the sequence length changes
    /// while the list is still plain. Non-interactive environments stay plain.
    pub fn hydrate<E>(&mut self, interactive: bool, len: usize, tx: &mpsc::Sender<E>)
    where
        E: From<FeedEvent> + Send + 'static,
    {
        if !self.enabled || !interactive || self.strategy == ListStrategy::Virtualized {
            return;
        }
        if self.armed_for == Some(len) {
            return;
        }
        self.abort();
        self.armed_for = Some(len);

        let mount = self.mount;
        let delay = self.delay;
        let tx = tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(FeedEvent::VirtualizationReady { mount }.into()).await.is_err() {
                tracing::debug!("Virtualization timer fired after receiver dropped");
            }
        }));
    }

    /// Handle the settle timer. Returns true when the strategy switched.
    pub fn on_ready(&mut self, mount: u64, len: usize) -> bool {
        self.handle = None;
        if mount != self.mount || self.strategy == ListStrategy::Virtualized {
            return false;
        }
        if len > self.threshold {
            tracing::debug!(len, mount, "Switching to virtualized list");
            self.strategy = ListStrategy::Virtualized;
            true
        } else {
            false
        }
    }

    /// A new feed view mounted: back to plain, pending timers dropped.
    pub fn remount(&mut self) {
        self.abort();
        self.mount = self.mount.wrapping_add(1);
        self.strategy = ListStrategy::Plain;
        self.armed_for = None;
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for StrategySelector {
    fn drop(&mut self) {
        self.abort();
    }
}

/// One rendered row of the virtualized list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    /// The window item at this index.
    Post { index: usize },
    /// Synthetic trailing row shown while more pages exist.
    Loading,
}

/// Rows to lay out for a scroll position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualRange {
    /// Rows intersecting the viewport.
    pub visible: Range<usize>,
    /// Visible rows plus overscan on both sides.
    pub rendered: Range<usize>,
}

/// Fixed-row-height virtualization over the window items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualList {
    pub row_height: f64,
    pub overscan: usize,
    pub load_threshold: usize,
}

impl Default for VirtualList {
    fn default() -> Self {
        Self {
            row_height: 450.0,
            overscan: 5,
            load_threshold: 5,
        }
    }
}

impl VirtualList {
    pub fn item_count(&self, len: usize, has_next: bool) -> usize {
        if has_next {
            len + 1
        } else {
            len
        }
    }

    pub fn is_item_loaded(&self, index: usize, len: usize, has_next: bool) -> bool {
        !has_next || index < len
    }

    pub fn content_height(&self, item_count: usize) -> f64 {
        item_count as f64 * self.row_height
    }

    pub fn row_top(&self, index: usize) -> f64 {
        index as f64 * self.row_height
    }

    /// Rows for a viewport at `offset` of `height`.
    ///
    /// `None` when there is nothing to lay out, including a zero-height
    /// viewport.
    pub fn visible_range(&self, offset: f64, height: f64, item_count: usize) -> Option<VirtualRange> {
        if height <= 0.0 || item_count == 0 || self.row_height <= 0.0 {
            return None;
        }
        let offset = offset.max(0.0);
        let first = ((offset / self.row_height).floor() as usize).min(item_count - 1);
        let last = (((offset + height) / self.row_height).ceil() as usize)
            .max(first + 1)
            .min(item_count);
        let rendered = first.saturating_sub(self.overscan)..(last + self.overscan).min(item_count);
        Some(VirtualRange {
            visible: first..last,
            rendered,
        })
    }

    pub fn row(&self, index: usize, len: usize, has_next: bool) -> Option<Row> {
        if index < len {
            Some(Row::Post { index })
        } else if index == len && has_next {
            Some(Row::Loading)
        } else {
            None
        }
    }

    /// Whether the rendered range is close enough to an unloaded row to
    /// request the next page.
    pub fn should_load_more(&self, range: &VirtualRange, len: usize, has_next: bool, loading: bool) -> bool {
        if loading {
            return false;
        }
        let lower = range.rendered.start.saturating_sub(self.load_threshold);
        let upper = (range.rendered.end + self.load_threshold).min(self.item_count(len, has_next));
        (lower..upper).any(|index| !self.is_item_loaded(index, len, has_next))
    }
}

/// Geometry of the plain list: backward sentinel, rows, forward sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListLayout {
    pub row_height: f64,
    pub sentinel_height: f64,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            row_height: 450.0,
            sentinel_height: SENTINEL_HEIGHT,
        }
    }
}

impl ListLayout {
    pub fn backward_sentinel(&self) -> Span {
        Span::new(0.0, self.sentinel_height)
    }

    pub fn row_span(&self, index: usize) -> Span {
        Span::new(self.sentinel_height + index as f64 * self.row_height, self.row_height)
    }

    pub fn forward_sentinel(&self, len: usize) -> Span {
        Span::new(self.sentinel_height + len as f64 * self.row_height, self.sentinel_height)
    }

    pub fn content_height(&self, len: usize) -> f64 {
        2.0 * self.sentinel_height + len as f64 * self.row_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_item_count_and_loaded() {
        let list = VirtualList::default();
        assert_eq!(list.item_count(20, true), 21);
        assert_eq!(list.item_count(20, false), 20);
        assert!(list.is_item_loaded(19, 20, true));
        assert!(!list.is_item_loaded(20, 20, true));
        assert!(list.is_item_loaded(20, 20, false));
    }

    #[test]
    fn test_last_page_renders_exactly_items() {
        let list = VirtualList::default();
        let count = list.item_count(20, false);
        let range = list.visible_range(0.0, 1e6, count).unwrap();
        let rows: Vec<Row> = range
            .rendered
            .filter_map(|i| list.row(i, 20, false))
            .collect();
        assert_eq!(rows.len(), 20);
        assert!(rows.iter().all(|r| matches!(r, Row::Post { .. })));
    }

    #[test]
    fn test_loading_row_when_more_pages() {
        let list = VirtualList::default();
        assert_eq!(list.row(20, 20, true), Some(Row::Loading));
        assert_eq!(list.row(20, 20, false), None);
        assert_eq!(list.row(3, 20, true), Some(Row::Post { index: 3 }));
    }

    #[test]
    fn test_visible_range_with_overscan() {
        let list = VirtualList::default();
        // Rows 10..12 visible at 450px per row
        let range = list.visible_range(4500.0, 900.0, 21).unwrap();
        assert_eq!(range.visible, 10..12);
        assert_eq!(range.rendered, 5..17);

        let top = list.visible_range(0.0, 900.0, 21).unwrap();
        assert_eq!(top.rendered, 0..7);
    }

    #[test]
    fn test_zero_height_viewport_not_laid_out() {
        let list = VirtualList::default();
        assert_eq!(list.visible_range(0.0, 0.0, 21), None);
        assert_eq!(list.visible_range(0.0, 900.0, 0), None);
    }

    #[test]
    fn test_should_load_more_near_end() {
        let list = VirtualList::default();
        let near_top = list.visible_range(0.0, 900.0, 21).unwrap();
        assert!(!list.should_load_more(&near_top, 20, true, false));

        let near_end = list.visible_range(4500.0, 900.0, 21).unwrap();
        assert!(list.should_load_more(&near_end, 20, true, false));
        assert!(!list.should_load_more(&near_end, 20, true, true));
        assert!(!list.should_load_more(&near_end, 20, false, false));
    }

    #[test]
    fn test_layout_geometry() {
        let layout = ListLayout::default();
        assert_eq!(layout.row_span(0).top, 48.0);
        assert_eq!(layout.forward_sentinel(2).top, 948.0);
        assert_eq!(layout.content_height(2), 996.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selector_switches_after_delay_for_long_lists() {
        let (tx, mut rx) = mpsc::channel::<FeedEvent>(4);
        let mut selector = StrategySelector::new(true, 10, Duration::from_millis(1000));
        selector.hydrate(true, 20, &tx);
        assert_eq!(selector.strategy(), ListStrategy::Plain);

        let Some(FeedEvent::VirtualizationReady { mount }) = rx.recv().await else {
            panic!("expected timer event");
        };
        assert!(selector.on_ready(mount, 20));
        assert_eq!(selector.strategy(), ListStrategy::Virtualized);

        // One-directional for the mount
        assert!(!selector.on_ready(mount, 3));
        assert_eq!(selector.strategy(), ListStrategy::Virtualized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selector_stays_plain_for_short_lists() {
        let (tx, mut rx) = mpsc::channel::<FeedEvent>(4);
        let mut selector = StrategySelector::new(true, 10, Duration::from_millis(1000));
        selector.hydrate(true, 10, &tx);

        let Some(FeedEvent::VirtualizationReady { mount }) = rx.recv().await else {
            panic!("expected timer event");
        };
        assert!(!selector.on_ready(mount, 10));
        assert_eq!(selector.strategy(), ListStrategy::Plain);
    }

    #[test]
    fn test_selector_ignores_previous_mount() {
        let mut selector = StrategySelector::new(true, 10, Duration::from_millis(1000));
        selector.remount();
        assert!(!selector.on_ready(0, 50));
        assert!(selector.on_ready(1, 50));
    }

    #[tokio::test]
    async fn test_headless_never_virtualizes() {
        let (tx, _rx) = mpsc::channel::<FeedEvent>(4);
        let mut selector = StrategySelector::new(true, 10, Duration::from_millis(1000));
        selector.hydrate(false, 50, &tx);
        assert!(selector.handle.is_none());
    }
}
