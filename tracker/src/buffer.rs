use std::mem;
use std::sync::Mutex;

use crate::event::TrackedEvent;

/// Pending events shared between request handlers and the drain loop.
///
/// Producers append under a mutex; the drain loop swaps the whole collection
/// out in one move. Both critical sections are O(1) (a push or a pointer
/// swap), so contention stays bounded no matter how large the buffer grows.
/// There is no capacity bound: unbounded growth between drains is an accepted
/// risk.
#[derive(Default)]
pub struct EventBuffer {
    pending: Mutex<Vec<TrackedEvent>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event. Never blocks callers beyond the brief lock.
    pub fn add(&self, event: TrackedEvent) {
        self.pending
            .lock()
            .expect("event buffer lock poisoned")
            .push(event);
    }

    /// Swap the internal collection for a fresh one and hand the previous
    /// one to the caller. Adds racing with the swap land in the new
    /// collection; no event is ever visible to two drains.
    pub fn drain(&self) -> Vec<TrackedEvent> {
        mem::take(&mut *self.pending.lock().expect("event buffer lock poisoned"))
    }
}
