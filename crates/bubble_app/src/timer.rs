//! Cancellable interval timers driven by the frame clock

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle returned by [`TimerRegistry::schedule`]
    pub struct TimerId;
}

#[derive(Clone, Copy, Debug)]
struct Interval<T> {
    task: T,
    interval_ms: u64,
    next_due_ms: u64,
}

/// Repeating timers keyed by [`TimerId`].
///
/// Nothing runs on its own: the owner polls [`due`](Self::due) with the
/// current time, usually once per frame.
#[derive(Debug)]
pub struct TimerRegistry<T> {
    timers: SlotMap<TimerId, Interval<T>>,
}

impl<T: Copy> TimerRegistry<T> {
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
        }
    }

    /// Fire `task` every `interval_ms`, first at `now_ms + interval_ms`.
    /// Intervals under 1 ms are raised to 1 ms.
    pub fn schedule(&mut self, task: T, interval_ms: u64, now_ms: u64) -> TimerId {
        let interval_ms = interval_ms.max(1);
        self.timers.insert(Interval {
            task,
            interval_ms,
            next_due_ms: now_ms.saturating_add(interval_ms),
        })
    }

    /// Returns false if the timer was already cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(id).is_some()
    }

    /// Cancel every timer, returning how many were live
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    /// Tasks whose interval elapsed by `now_ms`.
    ///
    /// A timer fires at most once per poll; missed intervals are skipped and
    /// the next deadline is measured from `now_ms`.
    pub fn due(&mut self, now_ms: u64) -> Vec<T> {
        let mut fired = Vec::new();
        for timer in self.timers.values_mut() {
            if now_ms >= timer.next_due_ms {
                fired.push(timer.task);
                timer.next_due_ms = now_ms.saturating_add(timer.interval_ms);
            }
        }
        fired
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl<T: Copy> Default for TimerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
