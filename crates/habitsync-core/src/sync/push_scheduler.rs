//! Debounced outbound writes.
//!
//! Edits mark the document dirty and (re)arm one timer. A burst of edits
//! inside the window therefore produces exactly one push. The dirty flag is
//! cleared only when a push that started after the last edit succeeds.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use super::scheduler::TaskSlot;

/// Shortest delay a push can be scheduled with.
pub const MIN_PUSH_DELAY: Duration = Duration::from_millis(100);

#[derive(Default)]
pub struct PushScheduler {
    slot: TaskSlot,
    dirty: AtomicBool,
    generation: AtomicU64,
}

impl PushScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local change.
    pub fn mark_dirty(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Edit counter; capture before a push and hand to [`Self::mark_clean_if`].
    pub fn dirty_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    /// Clear the dirty flag unless an edit landed after `generation` was read.
    /// Returns whether the flag was cleared.
    pub fn mark_clean_if(&self, generation: u64) -> bool {
        if self.dirty_generation() == generation {
            self.mark_clean();
            true
        } else {
            false
        }
    }

    /// Arm the timer, replacing any pending one. Delays below
    /// [`MIN_PUSH_DELAY`] are raised to it.
    pub fn schedule<F>(&self, delay: Duration, push: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = delay.max(MIN_PUSH_DELAY);
        tracing::debug!(delay_ms = delay.as_millis() as u64, "push scheduled");
        self.slot.schedule(delay, push);
    }

    pub fn cancel(&self) -> bool {
        self.slot.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_pending()
    }
}
