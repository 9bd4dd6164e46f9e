//! Deadline timers polled against an injected clock.
//!
//! Timers never spawn threads; the session owning them checks `poll` when
//! it handles an event. Cancel is idempotent and a fired timer stays fired.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Armed,
    Fired,
    Cancelled,
}

/// One-shot timer.
#[derive(Debug, Clone)]
pub struct Timer {
    deadline: Instant,
    state: TimerState,
}

impl Timer {
    pub fn at(deadline: Instant) -> Self {
        Self {
            deadline,
            state: TimerState::Armed,
        }
    }

    pub fn after(now: Instant, d: Duration) -> Self {
        Self::at(now + d)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == TimerState::Armed
    }

    /// Returns true exactly once, the first time `now` reaches the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.state == TimerState::Armed && now >= self.deadline {
            self.state = TimerState::Fired;
            return true;
        }
        false
    }

    /// No-op unless armed.
    pub fn cancel(&mut self) {
        if self.state == TimerState::Armed {
            self.state = TimerState::Cancelled;
        }
    }

    /// Time left until the deadline, `None` unless armed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.is_armed()
            .then(|| self.deadline.saturating_duration_since(now))
    }
}
