//! The window manager.
//!
//! Holds the materialized slice `[start, start + size)` of the active
//! sequence. Slides are two-phase: `begin_slide` claims the single in-flight
//! slot and `commit` applies the move once the settle delay has elapsed.
//! Every re-initialization bumps a generation counter so that a slide begun
//! against an older sequence is discarded at commit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::sequence::Sequence;
use super::{FeedEvent, LOAD_COOLDOWN, SETTLE_DELAY, WINDOW_SIZE};
use crate::storage::Post;

/// Estimated height of one post card when only a raw scroll offset is known.
pub const ESTIMATED_ROW_HEIGHT: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub size: usize,
    pub cooldown: Duration,
    pub settle_delay: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: WINDOW_SIZE,
            cooldown: LOAD_COOLDOWN,
            settle_delay: SETTLE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    Forward,
    Backward,
}

/// Claim on the in-flight slot, redeemed by [`WindowManager::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideTicket {
    direction: SlideDirection,
    generation: u64,
}

impl SlideTicket {
    pub fn direction(&self) -> SlideDirection {
        self.direction
    }
}

/// Result of asking for a slide. Everything but `Started` is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideOutcome {
    Started(SlideTicket),
    /// A slide of either direction is already pending.
    InFlight,
    /// The previous slide was too recent.
    CoolingDown,
    /// No page exists in the requested direction.
    AtEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied { start: usize },
    /// The ticket was valid but the window could not move (sequence shrank).
    Unchanged,
    /// The ticket belongs to a superseded sequence and was dropped.
    Stale,
}

pub struct WindowManager {
    config: WindowConfig,
    sequence: Sequence,
    start: usize,
    generation: u64,
    in_flight: Option<SlideDirection>,
    last_slide: Option<Instant>,
}

impl WindowManager {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            sequence: Arc::from(Vec::<Post>::new()),
            start: 0,
            generation: 0,
            in_flight: None,
            last_slide: None,
        }
    }

    /// Open a window at the head of a new sequence.
    pub fn initialize(&mut self, sequence: Sequence) {
        self.initialize_at(sequence, 0);
    }

    /// Open a window at `start` (clamped) of a new sequence.
    ///
    /// Any slide in flight is abandoned.
    pub fn initialize_at(&mut self, sequence: Sequence, start: usize) {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = None;
        self.start = clamp_start(start, sequence.len(), self.config.size);
        self.sequence = sequence;
        tracing::debug!(
            generation = self.generation,
            start = self.start,
            len = self.sequence.len(),
            "Window initialized"
        );
    }

    /// Replace the sequence without changing criteria (e.g. upstream data
    /// refreshed). The current start is kept but re-clamped to the new length.
    pub fn resync(&mut self, sequence: Sequence) {
        let start = self.start;
        self.initialize_at(sequence, start);
        if self.start != start {
            tracing::debug!(from = start, to = self.start, "Window re-clamped after resync");
        }
    }

    /// Forget any slide in flight without touching the window.
    pub fn abandon_slide(&mut self) {
        if self.in_flight.take().is_some() {
            self.generation = self.generation.wrapping_add(1);
            tracing::debug!(generation = self.generation, "Abandoned in-flight slide");
        }
    }

    /// Drop the sequence entirely (criteria changed, nothing to show yet).
    pub fn clear(&mut self) {
        self.initialize(Arc::from(Vec::<Post>::new()));
    }

    pub fn items(&self) -> &[Post] {
        &self.sequence[self.start..self.end()]
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        (self.start + self.config.size).min(self.sequence.len())
    }

    pub fn size(&self) -> usize {
        self.config.size
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn has_next(&self) -> bool {
        self.start + self.config.size < self.sequence.len()
    }

    pub fn has_previous(&self) -> bool {
        self.start > 0
    }

    pub fn in_flight(&self) -> Option<SlideDirection> {
        self.in_flight
    }

    pub fn is_loading(&self, direction: SlideDirection) -> bool {
        self.in_flight == Some(direction)
    }

    /// Try to claim the slot for a slide in `direction`.
    pub fn begin_slide(&mut self, direction: SlideDirection, now: Instant) -> SlideOutcome {
        if self.in_flight.is_some() {
            return SlideOutcome::InFlight;
        }
        if let Some(last) = self.last_slide {
            if now.saturating_duration_since(last) < self.config.cooldown {
                return SlideOutcome::CoolingDown;
            }
        }
        let has_more = match direction {
            SlideDirection::Forward => self.has_next(),
            SlideDirection::Backward => self.has_previous(),
        };
        if !has_more {
            return SlideOutcome::AtEdge;
        }

        self.in_flight = Some(direction);
        self.last_slide = Some(now);
        tracing::debug!(?direction, start = self.start, "Slide started");
        SlideOutcome::Started(SlideTicket {
            direction,
            generation: self.generation,
        })
    }

    /// Apply a settled slide.
    ///
    /// The cooldown restarts at commit so that it is measured from the
    /// completion of the slide.
    pub fn commit(&mut self, ticket: SlideTicket, now: Instant) -> CommitOutcome {
        if ticket.generation != self.generation || self.in_flight != Some(ticket.direction) {
            tracing::debug!(
                ticket_generation = ticket.generation,
                generation = self.generation,
                "Dropping stale slide"
            );
            return CommitOutcome::Stale;
        }
        self.in_flight = None;
        self.last_slide = Some(now);

        let len = self.sequence.len();
        let size = self.config.size;
        let new_start = match ticket.direction {
            SlideDirection::Forward if self.start + size < len => (self.start + size).min(len - size),
            SlideDirection::Forward => self.start,
            SlideDirection::Backward => self.start.saturating_sub(size),
        };

        if new_start == self.start {
            return CommitOutcome::Unchanged;
        }
        tracing::debug!(from = self.start, to = new_start, direction = ?ticket.direction, "Slide committed");
        self.start = new_start;
        CommitOutcome::Applied { start: new_start }
    }

    /// Begin a slide and deliver [`FeedEvent::SlideSettled`] after the settle delay.
    pub fn schedule_slide<E>(&mut self, direction: SlideDirection, tx: &mpsc::Sender<E>) -> SlideOutcome
    where
        E: From<FeedEvent> + Send + 'static,
    {
        let outcome = self.begin_slide(direction, Instant::now());
        if let SlideOutcome::Started(ticket) = outcome {
            let delay = self.config.settle_delay;
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if tx.send(FeedEvent::SlideSettled(ticket).into()).await.is_err() {
                    tracing::debug!("Slide settled after receiver dropped");
                }
            });
        }
        outcome
    }
}

/// Keep `start` within `[0, max(0, len - size)]`.
fn clamp_start(start: usize, len: usize, size: usize) -> usize {
    start.min(len.saturating_sub(size))
}

/// Estimate a window start from a raw scroll offset.
///
/// Used when a stored scroll position carries no window context: the row
/// under `y` is estimated from a fixed row height and the window is centred
/// on it.
pub fn start_for_offset(y: f64, row_height: f64, len: usize, size: usize) -> usize {
    if len == 0 || row_height <= 0.0 || !y.is_finite() || y <= 0.0 {
        return 0;
    }
    let estimated = (y / row_height).floor() as usize;
    let index = estimated.min(len - 1);
    clamp_start(index.saturating_sub(size / 2), len, size)
}
