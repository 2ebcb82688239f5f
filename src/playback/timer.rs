//! Cancellable one-shot timers and the per-frame task handle.
//!
//! Everything runs on the session's single logical thread: timers never fire
//! on their own, the owner collects due ones with `take_due` from its frame
//! tick. A cancelled timer is removed from the queue, so it can never be
//! returned afterwards.

use crate::core::time::Millis;

#[derive(Debug)]
struct Pending<A> {
    /// Arming order, breaks ties between equal deadlines
    seq: u64,
    fire_at: Millis,
    action: A,
}

/// Queue of pending one-shot timers carrying an action each
#[derive(Debug)]
pub struct TimerQueue<A> {
    next_seq: u64,
    pending: Vec<Pending<A>>,
}

impl<A> TimerQueue<A> {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            pending: Vec::new(),
        }
    }

    /// Arm a timer firing at absolute time `fire_at`
    pub fn schedule(&mut self, fire_at: Millis, action: A) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending { seq, fire_at, action });
    }

    /// Cancel every pending timer, returning how many were dropped
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Remove and return the actions due at `now`, earliest first
    pub fn take_due(&mut self, now: Millis) -> Vec<A> {
        let (mut due, rest): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|pending| pending.fire_at <= now);
        self.pending = rest;
        due.sort_by_key(|pending| (pending.fire_at, pending.seq));
        due.into_iter().map(|pending| pending.action).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Recurring per-frame task owned by a session.
/// Started when the session opens; once cancelled it stays cancelled.
#[derive(Debug)]
pub struct FrameTask {
    active: bool,
    frames: u64,
}

impl FrameTask {
    pub fn start() -> Self {
        Self {
            active: true,
            frames: 0,
        }
    }

    /// Account for one frame. Returns false when the task is cancelled.
    pub fn begin_frame(&mut self) -> bool {
        if self.active {
            self.frames += 1;
        }
        self.active
    }

    pub fn cancel(&mut self) {
        self.active = false;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
