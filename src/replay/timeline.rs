//! Reversible trail timeline.
//!
//! A bounded history of end-mass positions with a cursor. Forward play
//! appends at the head; stepping back moves the cursor and refreshes the
//! slot it lands on; stepping forward after a rewind overwrites stale
//! future points instead of branching.
//!
//! # States
//!
//! - *empty*: no points
//! - *at-head*: `index == len`
//! - *scrubbed*: `index < len`, reached by stepping back
//!
//! A transient rewind flag separates "the user just stepped back while
//! paused" from ordinary playback. While paused and not rewinding, a cursor
//! that fell below the high-water mark is restored on reconciliation, so
//! pausing never shrinks the drawn trail.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domains::pendulum::Point2;

/// Cartesian end-mass position in model units.
pub type TrailPoint = Point2;

/// Default maximum number of stored trail points.
pub const DEFAULT_TRAIL_CAPACITY: usize = 50_000;

/// Bounded, rewindable trail history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailTimeline {
    history: VecDeque<TrailPoint>,
    index: usize,
    high_water_mark: usize,
    rewind_in_progress: bool,
    capacity: usize,
}

impl TrailTimeline {
    /// Create an empty timeline holding at most `capacity` points (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::new(),
            index: 0,
            high_water_mark: 0,
            rewind_in_progress: false,
            capacity: capacity.max(1),
        }
    }

    /// Discard everything and start over from a single point.
    pub fn reset_with(&mut self, point: TrailPoint) {
        self.history.clear();
        self.history.push_back(point);
        self.index = 1;
        self.high_water_mark = 1;
        self.rewind_in_progress = false;
    }

    /// Record the next point of forward motion.
    ///
    /// While scrubbed, the point at the cursor is overwritten (redo). At the
    /// head the point is appended, dropping the oldest point at capacity.
    pub fn advance_forward(&mut self, point: TrailPoint) {
        if self.index < self.history.len() {
            self.history[self.index] = point;
            self.index += 1;
        } else {
            if self.history.len() >= self.capacity {
                self.history.pop_front();
            }
            self.history.push_back(point);
            self.index = self.history.len();
        }
        self.high_water_mark = self.index;
    }

    /// Move the cursor back one slot (never below 1) and refresh that slot.
    ///
    /// `point` is the end-mass position after the backward integration step.
    /// On an empty timeline the point is simply recorded.
    pub fn step_back(&mut self, point: TrailPoint) {
        if self.history.is_empty() {
            self.reset_with(point);
            self.rewind_in_progress = true;
            return;
        }

        self.index = self.index.saturating_sub(1).max(1);
        self.history[self.index - 1] = point;
        self.rewind_in_progress = true;
        self.high_water_mark = self.index;
    }

    /// Move the cursor without touching history or the high-water mark.
    ///
    /// Clamped to `[min(1, len), len]`.
    pub fn seek(&mut self, index: usize) {
        let len = self.history.len();
        self.index = index.clamp(len.min(1), len);
    }

    /// Render-time reconciliation; returns the number of visible points.
    ///
    /// While paused and not rewinding, a cursor below the high-water mark is
    /// restored to `min(high_water_mark, len)`. Then, while paused, the rewind
    /// flag is cleared and the high-water mark resynced to the cursor.
    pub fn reconcile(&mut self, paused: bool) -> usize {
        if paused && !self.rewind_in_progress && self.index < self.high_water_mark {
            self.index = self.high_water_mark.min(self.history.len());
        }
        if paused {
            self.rewind_in_progress = false;
            self.high_water_mark = self.index;
        }
        self.index
    }

    /// Points up to the cursor, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &TrailPoint> + '_ {
        self.history.iter().take(self.index)
    }

    /// Every stored point, including any stale future beyond the cursor.
    #[must_use]
    pub const fn history(&self) -> &VecDeque<TrailPoint> {
        &self.history
    }

    /// Cursor position.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Furthest cursor position recorded outside a rewind.
    #[must_use]
    pub const fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Whether the user has stepped back since the last paused reconciliation.
    #[must_use]
    pub const fn is_rewinding(&self) -> bool {
        self.rewind_in_progress
    }

    /// Maximum number of stored points.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether no points are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl Default for TrailTimeline {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIL_CAPACITY)
    }
}
