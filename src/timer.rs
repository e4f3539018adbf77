//! Cancellable scheduled tasks
//!
//! The core never sleeps. Anything that has to happen "later" (zap commit,
//! retry reload, controls auto-hide, now-playing refresh) is registered in a
//! [`TimerQueue`] with an explicit deadline, and the event loop drains due
//! entries with [`TimerQueue::take_due`].
//!
//! A [`TimerSlot`] names one logical timer. Arming a slot always cancels the
//! handle it previously held, so at most one instance of a logical timer is
//! ever pending.

use std::time::{Duration, Instant};

/// Opaque handle returned by [`TimerQueue::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Entry<T> {
    handle: TimerHandle,
    deadline: Instant,
    payload: T,
}

/// Deadline-ordered queue of pending timers
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire `delay` after `now`
    pub fn schedule(&mut self, now: Instant, delay: Duration, payload: T) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.entries.push(Entry {
            handle,
            deadline: now + delay,
            payload,
        });
        handle
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Earliest pending deadline, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// in deadline order (ties broken by scheduling order).
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerHandle, T)> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].deadline <= now {
                due.push(self.entries.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.handle.0.cmp(&b.handle.0)));
        due.into_iter().map(|e| (e.handle, e.payload)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One logical timer: re-arming cancels the previous instance first
#[derive(Debug, Default, Clone)]
pub struct TimerSlot {
    handle: Option<TimerHandle>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending instance and schedule a new one
    pub fn arm<T>(
        &mut self,
        queue: &mut TimerQueue<T>,
        now: Instant,
        delay: Duration,
        payload: T,
    ) -> TimerHandle {
        self.cancel(queue);
        let handle = queue.schedule(now, delay, payload);
        self.handle = Some(handle);
        handle
    }

    /// Cancel the pending instance, if any
    pub fn cancel<T>(&mut self, queue: &mut TimerQueue<T>) -> bool {
        match self.handle.take() {
            Some(handle) => queue.cancel(handle),
            None => false,
        }
    }

    pub fn is_armed<T>(&self, queue: &TimerQueue<T>) -> bool {
        self.handle.map(|h| queue.is_pending(h)).unwrap_or(false)
    }

    /// Called when `handle` fired. Returns true (and disarms) only if it is
    /// the instance this slot currently owns.
    pub fn claim(&mut self, handle: TimerHandle) -> bool {
        if self.handle == Some(handle) {
            self.handle = None;
            true
        } else {
            false
        }
    }
}
