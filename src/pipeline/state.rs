//! Shared latest-reading cell
//!
//! Single-slot, "latest wins" hand-off between the sensor reader (one writer)
//! and any number of pollers. Backed by [`ArcSwap`], so a `set` is one atomic
//! pointer swap and a `get` never blocks or observes a half-written reading.
//! Unread readings are dropped when overwritten; there is no queue.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::types::LatestReading;

/// Thread-safe holder of the most recent [`LatestReading`].
pub struct LatestState {
    cell: ArcSwap<LatestReading>,
}

impl LatestState {
    /// Create a cell holding the zero reading (`sequence == 0`, 0.0 angles).
    pub fn new() -> Self {
        Self {
            cell: ArcSwap::from_pointee(LatestReading::default()),
        }
    }

    /// Replace the held reading wholesale.
    pub fn set(&self, reading: LatestReading) {
        self.cell.store(Arc::new(reading));
    }

    /// Snapshot of the most recent reading.
    pub fn get(&self) -> Arc<LatestReading> {
        self.cell.load_full()
    }
}

impl Default for LatestState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LatestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatestState")
            .field("latest", &*self.cell.load())
            .finish()
    }
}
