//! Per-cycle deadlines shared between a driver and its producer tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// A deadline that can be checked from multiple tasks.
///
/// Clones share the same expiry instant and the same "abandoned" flag, so a
/// producer task holding a clone can notice that the driver has already
/// stopped waiting for it.
///
/// Time is measured with `tokio::time::Instant`, which makes deadlines
/// deterministic under a paused test clock.
#[derive(Debug, Clone)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
    abandoned: Arc<AtomicBool>,
}

impl Deadline {
    /// Create a new deadline expiring `budget` from now.
    pub fn new(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
            abandoned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The instant at which the deadline expires.
    pub fn instant(&self) -> Instant {
        self.start + self.budget
    }

    /// Check if the deadline has passed or was abandoned.
    pub fn is_expired(&self) -> bool {
        self.is_abandoned() || self.remaining().is_zero()
    }

    /// Get remaining time. Returns Duration::ZERO if expired.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }

    /// Wait until the deadline passes.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.instant()).await;
    }

    /// Mark the deadline as abandoned: whoever was waiting on it gave up.
    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::Relaxed);
    }

    /// Whether `abandon` was called on this deadline or any of its clones.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Relaxed)
    }
}
