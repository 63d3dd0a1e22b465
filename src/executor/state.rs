//! Dispatch state tracking
//!
//! Tracks futures that have been handed to an executor but not yet observed
//! complete. Insertions come from the submitting thread and removals from
//! completion callbacks, which usually run on a worker thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::Completion;

/// Identifier assigned to each tracked dispatch
pub type DispatchId = u64;

// ─────────────────────────────────────────────────────────────────
// Dispatch Tracker
// ─────────────────────────────────────────────────────────────────

/// Thread-safe set of in-flight futures
pub struct DispatchTracker {
    /// In-flight futures by dispatch ID
    dispatched: Mutex<HashMap<DispatchId, Arc<dyn Completion>>>,

    /// Next dispatch ID
    next_id: AtomicU64,

    /// Completed dispatch count (since creation)
    completed_count: AtomicU64,

    /// Failed dispatch count (since creation)
    failed_count: AtomicU64,
}

impl DispatchTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            dispatched: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            completed_count: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
        }
    }

    /// Start tracking a future, returning its dispatch ID
    pub fn track(&self, handle: Arc<dyn Completion>) -> DispatchId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.dispatched.lock().insert(id, handle);
        id
    }

    /// Record a finished dispatch and stop tracking it.
    ///
    /// Returns false if the ID was not tracked.
    pub fn finish(&self, id: DispatchId, failed: bool) -> bool {
        if self.dispatched.lock().remove(&id).is_none() {
            return false;
        }
        if failed {
            self.failed_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.completed_count.fetch_add(1, Ordering::Relaxed);
        }
        true
    }

    /// Stop tracking a dispatch that never reached the executor
    pub fn discard(&self, id: DispatchId) -> bool {
        self.dispatched.lock().remove(&id).is_some()
    }

    /// Copy of the currently tracked futures
    pub fn snapshot(&self) -> Vec<Arc<dyn Completion>> {
        self.dispatched.lock().values().cloned().collect()
    }

    /// Whether a dispatch is still tracked
    pub fn is_tracked(&self, id: DispatchId) -> bool {
        self.dispatched.lock().contains_key(&id)
    }

    /// Number of in-flight dispatches
    pub fn in_flight(&self) -> usize {
        self.dispatched.lock().len()
    }

    /// Get total completed count
    pub fn total_completed(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    /// Get total failed count
    pub fn total_failed(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }
}

impl Default for DispatchTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
