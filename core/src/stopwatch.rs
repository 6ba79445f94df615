//! Latched, rearmable elapsed-time gate.

use std::time::Duration;

/// Monotonic elapsed-time gate driven by an externally accumulated clock.
///
/// The elapsed result is **latched**: once the gate has reported true it keeps
/// reporting true, without re-deriving the comparison, until the next reset.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    duration: Duration,
    armed_at: Duration,
    elapsed: bool,
}

impl Stopwatch {
    /// Creates a stopwatch armed at clock zero with the provided duration.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            armed_at: Duration::ZERO,
            elapsed: false,
        }
    }

    /// The duration the stopwatch is currently armed with.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Re-arms from the provided clock reading, clearing the latch.
    pub fn reset(&mut self, now: Duration) {
        self.armed_at = now;
        self.elapsed = false;
    }

    /// Re-arms with a new duration; a zero duration keeps the existing one.
    pub fn reset_with(&mut self, now: Duration, duration: Duration) {
        if !duration.is_zero() {
            self.duration = duration;
        }
        self.reset(now);
    }

    /// Reports whether the armed duration has passed at the given clock.
    ///
    /// True iff `now - armed_at > duration`; the result latches at true until
    /// the next reset, even if the clock reading regresses.
    pub fn is_elapsed(&mut self, now: Duration) -> bool {
        if self.elapsed {
            return true;
        }

        self.elapsed = now.saturating_sub(self.armed_at) > self.duration;
        self.elapsed
    }
}
