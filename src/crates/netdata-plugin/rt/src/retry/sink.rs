//! Producer-side handle for channel-style collectors.

use netdata_plugin_foundation::Deadline;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// One value for one dimension of one chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub chart: String,
    pub dim: String,
    pub value: String,
}

impl Metric {
    pub fn new(chart: impl Into<String>, dim: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            dim: dim.into(),
            value: value.into(),
        }
    }
}

/// A handle producers use to push metrics to the retry loop.
///
/// Multiple handles can exist for the same cycle (they share the underlying
/// channel). Clone it into every producer task. The cycle ends once every
/// handle has been dropped or the cycle deadline passes, whichever comes
/// first. Metrics sent after that are counted as dropped.
#[derive(Debug, Clone)]
pub struct MetricSink {
    tx: mpsc::Sender<Metric>,
    dropped: Arc<AtomicU64>,
    deadline: Deadline,
}

impl MetricSink {
    pub(crate) fn new(tx: mpsc::Sender<Metric>, dropped: Arc<AtomicU64>, deadline: Deadline) -> Self {
        Self { tx, dropped, deadline }
    }

    /// Queue a metric, waiting for channel capacity until the cycle deadline.
    ///
    /// Returns `false` if the metric was dropped.
    pub async fn send(&self, metric: Metric) -> bool {
        if self.deadline.is_abandoned() {
            return self.drop_metric();
        }
        match tokio::time::timeout(self.deadline.remaining(), self.tx.send(metric)).await {
            Ok(Ok(())) => true,
            _ => self.drop_metric(),
        }
    }

    /// Queue a new value for `dim` on `chart`.
    pub async fn update(&self, chart: impl Into<String>, dim: impl Into<String>, value: impl ToString) -> bool {
        self.send(Metric::new(chart, dim, value.to_string())).await
    }

    /// Queue a metric without waiting, for producers outside async code.
    pub fn try_send(&self, metric: Metric) -> bool {
        match self.tx.try_send(metric) {
            Ok(()) => true,
            Err(_) => self.drop_metric(),
        }
    }

    /// The deadline of the cycle this sink belongs to.
    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Whether the retry loop stopped receiving for this cycle.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn drop_metric(&self) -> bool {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        false
    }
}
