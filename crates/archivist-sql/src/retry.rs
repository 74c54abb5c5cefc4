use std::time::Duration;

/// Bounded exponential backoff for connection establishment.
///
/// Attempt `n` (1-based) that fails is followed by a wait of
/// `base * 2^n` before attempt `n + 1`. The last attempt is never followed
/// by a wait: its error is surfaced instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: u32,
    base: Duration,
}

impl RetryPolicy {
    /// `max_tries` is clamped to at least one attempt.
    pub fn new(max_tries: u32, base: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            base,
        }
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Wait after failed attempt `attempt`, or `None` if it was the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_tries {
            return None;
        }
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        Some(self.base.saturating_mul(factor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}
