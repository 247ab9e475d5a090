//! Bounded navigation history with a replay cursor.
//!
//! The cursor points at the currently displayed entry; the live edge is the
//! newest entry, where fresh draws happen.  Replayed entries never touch the
//! recency window or the year budget: those were updated when the entry was
//! first drawn.

use std::collections::VecDeque;

use tracing::debug;

use crate::errors::{SlideshowError, SlideshowResult};
use crate::models::{HistoryEntry, SlideEntry};

pub struct HistoryNavigator {
    entries: VecDeque<HistoryEntry>,
    /// Position of the current entry; meaningful only when non-empty.
    cursor: usize,
    capacity: usize,
    /// Monotonic display tick, stamped on each fresh draw.
    tick: u64,
}

impl HistoryNavigator {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
            tick: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// At the forward-most position, where the next `next()` draws fresh.
    pub fn at_live_edge(&self) -> bool {
        self.entries.is_empty() || self.cursor + 1 == self.entries.len()
    }

    /// Advance: replay the next recorded entry, or draw a new one at the
    /// live edge via `draw` and record it.
    pub fn next<F>(&mut self, draw: F) -> SlideshowResult<SlideEntry>
    where
        F: FnOnce() -> SlideshowResult<SlideEntry>,
    {
        if !self.at_live_edge() {
            self.cursor += 1;
            return Ok(self.entries[self.cursor].entry.clone());
        }

        let entry = draw()?;
        self.tick += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            // The cursor keeps pointing at the same logical entry.
            self.cursor = self.cursor.saturating_sub(1);
            debug!(capacity = self.capacity, "oldest history entry evicted");
        }
        self.entries.push_back(HistoryEntry {
            entry: entry.clone(),
            tick: self.tick,
        });
        self.cursor = self.entries.len() - 1;
        Ok(entry)
    }

    /// Step back to the previously shown entry.
    pub fn previous(&mut self) -> SlideshowResult<SlideEntry> {
        if self.cursor == 0 || self.entries.is_empty() {
            return Err(SlideshowError::NoHistory);
        }
        self.cursor -= 1;
        Ok(self.entries[self.cursor].entry.clone())
    }

    /// Entry currently under the cursor, if any.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    /// Drop everything (full rebuild path: recorded identifiers may no
    /// longer exist in the index).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        debug!("navigation history cleared");
    }
}
