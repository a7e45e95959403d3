//! Owned, cancellable timers driven by an external clock.
//!
//! Components schedule payloads against a deadline and later ask for everything
//! that has come due. Nothing fires on its own, which keeps the owner in control
//! of when its state mutates.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<T> {
    handle: TimerHandle,
    due: Duration,
    payload: T,
}

#[derive(Debug)]
pub struct Timers<T> {
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, due: Duration, payload: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            due,
            payload,
        });
        handle
    }

    /// Returns `false` when the timer already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.handle != handle);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|timer| timer.handle == handle)
    }

    pub fn due_at(&self, handle: TimerHandle) -> Option<Duration> {
        self.pending
            .iter()
            .find(|timer| timer.handle == handle)
            .map(|timer| timer.due)
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|timer| timer.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Remove and return every timer with `due <= now`, ordered by deadline and
    /// then by scheduling order. Each entry carries its own deadline.
    pub fn fire_due(&mut self, now: Duration) -> Vec<(Duration, T)> {
        let mut fired = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due <= now {
                fired.push(self.pending.swap_remove(index));
            } else {
                index += 1;
            }
        }
        fired.sort_by_key(|timer| (timer.due, timer.handle));
        fired
            .into_iter()
            .map(|timer| (timer.due, timer.payload))
            .collect()
    }
}
