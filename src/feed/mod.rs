//! Windowed feed delivery and scroll restoration.
//!
//! A feed view never materializes its whole ordered sequence. It keeps a
//! fixed-size window over the sequence, slides that window as the reader
//! approaches either end of the rendered list, and remembers where the
//! reader was so that returning from a detail view lands on the same posts.
//!
//! # Module Structure
//!
//! - `sequence` - Sort & filter stage: newest-first ordering and search state
//! - `search` - Debounced, cancellable search task
//! - `window` - Window manager: the materialized slice and its slides
//! - `trigger` - Visibility triggers for the two list sentinels
//! - `list` - Plain and virtualized list strategies
//! - `scroll` - Session-scoped scroll position store
//! - `restore` - Scroll restorer with readiness gating and bounded retries
//! - `session` - One feed view composed from all of the above

mod list;
mod restore;
mod scroll;
mod search;
mod sequence;
mod session;
mod trigger;
mod window;

use std::time::Duration;

use crate::storage::{Post, SearchError};

pub use list::{
    ListLayout, ListStrategy, Row, StrategySelector, VirtualList, VirtualRange, SENTINEL_HEIGHT,
};
pub use restore::{
    always_ready, Readiness, RestoreConfig, RestoreOutcome, RestoreState, ScrollRestorer,
    SharedViewport, Viewport,
};
pub use scroll::{MemoryStorage, ScrollContext, ScrollPositionStore, ScrollRecord, SessionStorage};
pub use search::{DatabaseSearch, SearchBackend, SearchController};
pub use sequence::{sort_newest_first, ActiveSequence, QueryChange, Sequence, SortFilterStage};
pub use session::{FeedSession, FeedSettings};
pub use trigger::{Span, TriggerConfig, VisibilityTrigger};
pub use window::{
    start_for_offset, CommitOutcome, SlideDirection, SlideOutcome, SlideTicket, WindowConfig,
    WindowManager, ESTIMATED_ROW_HEIGHT,
};

/// Number of posts materialized at once
pub const WINDOW_SIZE: usize = 20;

/// Minimum time between two slides of either direction
pub const LOAD_COOLDOWN: Duration = Duration::from_millis(1000);

/// Artificial latency before a slide commits, keeping loading indicators visible
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Quiet period after the last keystroke before a search is issued
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);

/// Capabilities of the environment the feed runs in.
///
/// Injected once at startup instead of probing for features at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// The client is interactive (hydrated) and can host a virtualized list.
    pub interactive: bool,
    /// Sentinel visibility can be observed; otherwise only the manual
    /// "Load More" affordance slides the window.
    pub visibility_observer: bool,
    /// Scroll restoration can be taken over from the host.
    pub manual_scroll_restoration: bool,
}

impl Environment {
    /// A full interactive terminal.
    pub fn terminal() -> Self {
        Self {
            interactive: true,
            visibility_observer: true,
            manual_scroll_restoration: true,
        }
    }

    /// Non-interactive rendering: plain list, manual pagination, no scroll restoration.
    pub fn headless() -> Self {
        Self {
            interactive: false,
            visibility_observer: false,
            manual_scroll_restoration: false,
        }
    }
}

/// Results delivered from feed background tasks to the event loop.
#[derive(Debug)]
pub enum FeedEvent {
    /// A debounced search finished.
    ///
    /// Fields:
    /// - `generation`: Search generation when the task was spawned (stale detection)
    /// - `query`: The query text that was searched
    /// - `result`: Ranked matches or the failure
    SearchCompleted {
        generation: u64,
        query: String,
        result: Result<Vec<Post>, SearchError>,
    },
    /// The settle delay of a slide elapsed; the slide may now commit.
    SlideSettled(SlideTicket),
    /// The post-hydration settle delay elapsed for the given list mount.
    VirtualizationReady { mount: u64 },
}

/// `len` posts with ids `post-0..`, already newest first.
#[cfg(test)]
pub(crate) fn test_sequence(len: usize) -> Sequence {
    use chrono::{TimeZone, Utc};

    (0..len)
        .map(|i| Post {
            id: format!("post-{}", i),
            title: format!("Post {}", i),
            image: None,
            video: None,
            description: String::new(),
            slug: format!("post-{}", i),
            category: "funny".to_string(),
            source: "reddit".to_string(),
            subreddit: None,
            upvotes: None,
            created_at: Utc
                .timestamp_opt(1_700_000_000 - i as i64 * 60, 0)
                .single()
                .unwrap_or_default(),
            address: None,
        })
        .collect()
}
