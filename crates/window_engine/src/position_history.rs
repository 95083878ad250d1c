//! Rolling position history for wall-clock lookups.
//!
//! Keeps the last N fixes in a ring buffer; the oldest entry falls off as
//! new fixes arrive. Lookup is a linear scan, which at a history depth of a
//! few dozen entries beats maintaining an ordered index.

use std::fmt;

use contracts::PositionFix;
use ringbuf::{traits::*, HeapRb};

/// Bounded history of the most recent position fixes
pub struct PositionHistory {
    ring: HeapRb<PositionFix>,
}

impl fmt::Debug for PositionHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionHistory")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.ring.capacity())
            .finish()
    }
}

impl PositionHistory {
    /// Create a history holding at most `capacity` fixes
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity.max(1)),
        }
    }

    /// Record a fix, evicting the oldest when the ring is full
    #[inline]
    pub fn record(&mut self, fix: PositionFix) {
        if self.ring.is_full() {
            let _ = self.ring.try_pop();
        }
        let _ = self.ring.try_push(fix);
    }

    /// Fix closest in wall-clock time to `at_millis`, looking both directions
    ///
    /// Fixes arrive in timestamp order, so on an exact tie the earlier fix
    /// wins (it is encountered first in ring order).
    #[inline]
    pub fn nearest(&self, at_millis: i64) -> Option<PositionFix> {
        self.ring
            .iter()
            .min_by_key(|fix| (fix.timestamp_millis - at_millis).abs())
            .copied()
    }

    /// Number of fixes currently held
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    /// Check if the history is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
