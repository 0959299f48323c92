//! Update Scheduler
//!
//! Notifications never run effects synchronously. They add effects to a
//! pending set, and the first addition since the last flush asks the host for
//! a frame. Any number of writes in one synchronous block therefore coalesce
//! into a single flush.
//!
//! # Ordering
//!
//! Within one flush, effects run in the order they were first added to the
//! pending set. Effects enqueued while a flush is running land in a fresh
//! pending set and wait for the next frame, which prevents same-frame
//! cascades.

use indexmap::IndexSet;

use crate::reactive::EffectId;

/// Pending-set bookkeeping for one runtime.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    /// Effects waiting for the next flush, in insertion order.
    pending: IndexSet<EffectId>,

    /// Whether a frame callback is outstanding.
    frame_requested: bool,

    /// Number of flushes that ran at least one effect.
    flushes: u64,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect to the pending set.
    ///
    /// Returns true when the caller must request a frame: the set was not
    /// already waiting on one.
    pub fn enqueue(&mut self, id: EffectId) -> bool {
        self.pending.insert(id);
        if self.frame_requested {
            false
        } else {
            self.frame_requested = true;
            true
        }
    }

    /// Take the pending set for a flush. Anything enqueued afterwards needs a
    /// new frame.
    pub fn take_pending(&mut self) -> IndexSet<EffectId> {
        self.frame_requested = false;
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            self.flushes += 1;
        }
        pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.frame_requested = false;
    }
}
