//! The boundary between the scheduler and the scrapers that feed it.

use crate::charts::Chart;
use async_trait::async_trait;
use netdata_plugin_error::CollectResult;
use std::collections::HashMap;
use std::time::Duration;

/// A full snapshot of one collector: metric key to decimal string.
pub type Snapshot = HashMap<String, String>;

/// Identifies a collector registered with a [`Worker`](crate::Worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectorId(pub(crate) usize);

impl CollectorId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Trait implemented by every scraper driven by a [`Worker`](crate::Worker).
///
/// Each call returns a fresh, complete snapshot or fails as a whole; partial
/// snapshots are never salvaged. Collectors that talk to the network are
/// responsible for their own timeouts.
#[async_trait]
pub trait Collector: Send {
    /// Name used in log lines
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn collect(&mut self, ctx: &mut CollectContext) -> CollectResult<Snapshot>;
}

/// Per-call context handed to [`Collector::collect`].
#[derive(Debug)]
pub struct CollectContext {
    since_last_run: Duration,
    charts: Vec<Chart>,
}

impl CollectContext {
    pub fn new(since_last_run: Duration) -> Self {
        Self {
            since_last_run,
            charts: Vec::new(),
        }
    }

    /// Time elapsed by the last successful cycle plus the polling interval.
    ///
    /// Collectors whose work should happen less often than the display
    /// refresh subtract this from their own countdown on every call.
    pub fn since_last_run(&self) -> Duration {
        self.since_last_run
    }

    /// Register a chart bound to the calling collector.
    ///
    /// The chart is added once the call returns, and is rendered against the
    /// snapshot returned by this same call.
    pub fn add_chart(&mut self, chart: Chart) {
        self.charts.push(chart);
    }

    /// Charts registered during this call so far.
    pub fn pending_charts(&self) -> &[Chart] {
        &self.charts
    }

    pub(crate) fn into_charts(self) -> Vec<Chart> {
        self.charts
    }
}
