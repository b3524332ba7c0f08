//! Exponential backoff between failed collection cycles.

use std::time::Duration;

/// Doubling backoff with a ceiling.
///
/// The delay starts at `unit`. Every failure doubles it, up to `ceiling`, and
/// returns the new value as the delay to apply before the next attempt. A
/// single success resets it to `unit`.
///
/// After N consecutive failures the delay is `min(unit * 2^N, ceiling)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    unit: Duration,
    ceiling: Duration,
    delay: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(unit: Duration, ceiling: Duration) -> Self {
        Self {
            unit,
            ceiling,
            delay: unit,
            failures: 0,
        }
    }

    /// Backoff used by the retry loop: one second units, capped at twenty
    /// collection intervals.
    pub fn for_interval(interval: Duration) -> Self {
        Self::new(Duration::from_secs(1), interval.saturating_mul(20))
    }

    /// Record a failure and return the delay to wait before retrying.
    pub fn failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.delay = self.delay.saturating_mul(2).min(self.ceiling);
        self.delay
    }

    /// Record a success, resetting the delay.
    pub fn success(&mut self) {
        self.failures = 0;
        self.delay = self.unit;
    }

    /// The current delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_ceiling() {
        let interval = Duration::from_secs(1);
        let mut backoff = Backoff::for_interval(interval);

        let delays: Vec<u64> = (0..6).map(|_| backoff.failure().as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 20, 20]);
        assert_eq!(backoff.consecutive_failures(), 6);
    }

    #[test]
    fn test_backoff_law() {
        let interval = Duration::from_secs(10);
        for n in 1..12u32 {
            let mut backoff = Backoff::for_interval(interval);
            let mut last = Duration::ZERO;
            for _ in 0..n {
                last = backoff.failure();
            }
            let expected = Duration::from_secs(2u64.pow(n)).min(interval * 20);
            assert_eq!(last, expected, "after {} failures", n);
        }
    }

    #[test]
    fn test_success_resets() {
        let mut backoff = Backoff::for_interval(Duration::from_secs(10));
        backoff.failure();
        backoff.failure();
        assert_eq!(backoff.delay(), Duration::from_secs(4));

        backoff.success();
        assert_eq!(backoff.delay(), Duration::from_secs(1));
        assert_eq!(backoff.consecutive_failures(), 0);
        assert_eq!(backoff.failure(), Duration::from_secs(2));
    }
}
