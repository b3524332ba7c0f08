//! Driver for collectors that push metrics into a channel.
//!
//! A channel-style collector is a plain function handed a [`MetricSink`] on
//! every cycle. It may spawn any number of producer tasks, each holding a
//! clone of the sink. The [`RetryLoop`] drains the channel until every sink
//! is dropped or the cycle deadline passes, renders one block per chart and
//! sleeps. Failed cycles add an exponential backoff to that sleep.

mod registry;
mod sink;

pub use registry::{MetricRegistry, family};
pub use sink::{Metric, MetricSink};

use crate::charts::ChartWriter;
use crate::output::ProtocolWriter;
use netdata_plugin_error::{CollectError, CollectResult, Result};
use netdata_plugin_foundation::{Backoff, Deadline};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cycles run before [`RetryLoop::run`] returns so the process can be restarted.
pub const POLLS_BEFORE_RELOAD: u64 = 1000;

/// Capacity of the per-cycle metric channel.
pub const METRIC_CHANNEL_CAPACITY: usize = 100_000;

/// Chart type used when no prefix is configured.
pub const DEFAULT_PREFIX: &str = "openio";

/// Counters describing what a [`RetryLoop`] has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    pub cycles: u64,
    pub failures: u64,
    /// Metrics sent after their cycle stopped receiving, or that did not fit
    pub dropped_metrics: u64,
    /// Cycles that hit the deadline with producers still running
    pub abandoned_cycles: u64,
}

/// Scheduler for channel-style collectors.
///
/// # Example
///
/// ```ignore
/// let mut retry = RetryLoop::new(Duration::from_secs(10), ProtocolWriter::stdout())
///     .with_prefix("zookeeper");
///
/// retry
///     .run(|sink| async move {
///         sink.update("zk_avg_latency", "zk1", 3).await;
///         Ok(())
///     })
///     .await?;
/// ```
pub struct RetryLoop<W> {
    interval: Duration,
    deadline: Duration,
    max_cycles: u64,
    channel_capacity: usize,

    writer: ProtocolWriter<W>,
    buffer: ChartWriter,
    registry: MetricRegistry,

    backoff: Backoff,
    dropped: Arc<AtomicU64>,
    stats: RetryStats,
}

impl<W> RetryLoop<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(interval: Duration, writer: ProtocolWriter<W>) -> Self {
        Self {
            interval,
            deadline: interval,
            max_cycles: POLLS_BEFORE_RELOAD,
            channel_capacity: METRIC_CHANNEL_CAPACITY,
            writer,
            buffer: ChartWriter::new(),
            registry: MetricRegistry::new(DEFAULT_PREFIX),
            backoff: Backoff::for_interval(interval),
            dropped: Arc::new(AtomicU64::new(0)),
            stats: RetryStats::default(),
        }
    }

    /// Number of cycles before [`RetryLoop::run`] returns.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Chart type of every chart this loop declares.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.registry = MetricRegistry::new(prefix);
        self
    }

    /// How long a cycle waits for its producers. Defaults to the interval.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn stats(&self) -> RetryStats {
        RetryStats {
            dropped_metrics: self.dropped.load(Ordering::Relaxed),
            ..self.stats
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Run `collect` once per cycle until the cycle limit is reached.
    ///
    /// Only a failure to write the output ends the loop early.
    pub async fn run<F, Fut>(&mut self, collect: F) -> Result<RetryStats>
    where
        F: FnMut(MetricSink) -> Fut,
        Fut: Future<Output = CollectResult<()>>,
    {
        self.run_until(CancellationToken::new(), collect).await
    }

    /// Like [`RetryLoop::run`], also stopping once `token` is cancelled.
    pub async fn run_until<F, Fut>(&mut self, token: CancellationToken, mut collect: F) -> Result<RetryStats>
    where
        F: FnMut(MetricSink) -> Fut,
        Fut: Future<Output = CollectResult<()>>,
    {
        info!(
            interval = ?self.interval,
            deadline = ?self.deadline,
            max_cycles = self.max_cycles,
            prefix = self.registry.prefix(),
            "starting retry loop"
        );

        while self.stats.cycles < self.max_cycles && !token.is_cancelled() {
            let outcome = self.cycle(&mut collect).await?;

            let mut delay = self.interval;
            match outcome {
                Ok(()) => self.backoff.success(),
                Err(e) => {
                    self.stats.failures += 1;
                    let backoff = self.backoff.failure();
                    warn!(
                        error = %e,
                        backoff = ?backoff,
                        failures = self.backoff.consecutive_failures(),
                        "collection failed"
                    );
                    delay += backoff;
                }
            }

            if self.stats.cycles >= self.max_cycles {
                break;
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let stats = self.stats();
        info!(
            cycles = stats.cycles,
            failures = stats.failures,
            dropped = stats.dropped_metrics,
            "retry loop finished"
        );
        Ok(stats)
    }

    async fn cycle<F, Fut>(&mut self, collect: &mut F) -> Result<CollectResult<()>>
    where
        F: FnMut(MetricSink) -> Fut,
        Fut: Future<Output = CollectResult<()>>,
    {
        let start = Instant::now();
        let (tx, mut rx) = mpsc::channel(self.channel_capacity);
        let deadline = Deadline::new(self.deadline);
        let sink = MetricSink::new(tx, Arc::clone(&self.dropped), deadline.clone());

        let future = collect(sink);
        tokio::pin!(future);

        let mut outcome = None;
        let mut open = true;
        let mut metrics = Vec::new();

        while outcome.is_none() || open {
            tokio::select! {
                result = &mut future, if outcome.is_none() => outcome = Some(result),
                metric = rx.recv(), if open => match metric {
                    Some(metric) => metrics.push(metric),
                    None => open = false,
                },
                _ = deadline.expired() => break,
            }
        }

        if open {
            deadline.abandon();
            self.stats.abandoned_cycles += 1;
            warn!(deadline = ?self.deadline, "producers still running at the cycle deadline");
        }
        rx.close();
        while let Ok(metric) = rx.try_recv() {
            metrics.push(metric);
        }

        let received = metrics.len();
        let blocks = self.registry.render(metrics, &mut self.buffer);
        if !self.buffer.is_empty() {
            self.writer.write_raw(self.buffer.buffer()).await?;
            self.buffer.clear();
        }

        self.stats.cycles += 1;
        debug!(
            cycle = self.stats.cycles,
            metrics = received,
            charts = blocks,
            elapsed = ?start.elapsed(),
            "cycle complete"
        );

        Ok(outcome.unwrap_or(Err(CollectError::Timeout)))
    }
}
