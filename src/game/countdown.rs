// src/game/countdown.rs
use tokio::time::{Duration, Instant};

/// Wait of a single ping cycle.
///
/// While the game runs the countdown is `Armed` with an absolute deadline.
/// Pausing converts it into the unconsumed remainder, and resuming re-arms it
/// from that remainder so elapsed running time is never counted twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Armed { deadline: Instant },
    Suspended { remaining: Duration },
}

impl Countdown {
    pub fn arm(now: Instant, wait: Duration) -> Self {
        Countdown::Armed {
            deadline: now + wait,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match *self {
            Countdown::Armed { deadline } => deadline.saturating_duration_since(now),
            Countdown::Suspended { remaining } => remaining,
        }
    }

    /// Freeze the countdown. Suspending twice keeps the first remainder.
    pub fn suspend(&mut self, now: Instant) {
        if let Countdown::Armed { deadline } = *self {
            *self = Countdown::Suspended {
                remaining: deadline.saturating_duration_since(now),
            };
        }
    }

    /// Re-arm from the captured remainder and return the new deadline.
    pub fn resume(&mut self, now: Instant) -> Instant {
        match *self {
            Countdown::Armed { deadline } => deadline,
            Countdown::Suspended { remaining } => {
                let deadline = now + remaining;
                *self = Countdown::Armed { deadline };
                deadline
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, Countdown::Armed { .. })
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match *self {
            Countdown::Armed { deadline } => deadline <= now,
            Countdown::Suspended { .. } => false,
        }
    }
}
