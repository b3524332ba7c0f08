//! Per-second rates from monotonic counters.

use std::collections::HashMap;
use std::time::Instant;

/// Remembers the last sample of every counter it has seen and turns the
/// next one into a per-second rate.
///
/// Only needed for values a chart cannot declare as `incremental`, e.g. a
/// counter combined with other values before it is sent.
#[derive(Debug, Default)]
pub struct RateTracker {
    last: HashMap<String, (Instant, f64)>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for `key` at `at` and return the rate since the
    /// previous sample.
    ///
    /// Returns `None` for the first sample, when no time has passed, and when
    /// the counter went backwards (restart of the upstream).
    pub fn rate(&mut self, key: &str, value: f64, at: Instant) -> Option<f64> {
        let previous = self.last.insert(key.to_string(), (at, value));
        let (then, last) = previous?;

        let seconds = at.checked_duration_since(then)?.as_secs_f64();
        if seconds <= 0.0 || value < last {
            return None;
        }
        Some((value - last) / seconds)
    }

    /// Forget a counter, e.g. after its target went away.
    pub fn remove(&mut self, key: &str) -> bool {
        self.last.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
