/// Single-shot, cancellable delay driven by caller-supplied elapsed time.
///
/// Replaces "setTimeout + stored handle": there is at most one pending
/// deadline per timer, arming always replaces the previous one, and the
/// owner advances time explicitly, so tests run on a fake clock.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OneShotTimer {
    remaining: Option<u64>,
}

impl OneShotTimer {
    pub const fn new() -> Self {
        OneShotTimer { remaining: None }
    }

    /// Schedule a firing `delay_ms` from now, discarding any pending one.
    pub fn arm(&mut self, delay_ms: u64) {
        self.remaining = Some(delay_ms);
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn is_pending(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Let `elapsed_ms` pass. If the deadline is reached the timer disarms
    /// and returns the time left over after the firing point.
    pub fn advance(&mut self, elapsed_ms: u64) -> Option<u64> {
        let left = self.remaining?;
        if elapsed_ms >= left {
            self.remaining = None;
            Some(elapsed_ms - left)
        } else {
            self.remaining = Some(left - elapsed_ms);
            None
        }
    }
}
