//! Polling scheduler binding collectors to the charts they feed.

use crate::charts::{Chart, ChartWriter};
use crate::collector::{CollectContext, Collector, CollectorId, Snapshot};
use crate::output::ProtocolWriter;
use netdata_plugin_error::{ChartError, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Scheduler for snapshot collectors.
///
/// Every cycle asks each collector, in registration order, for a snapshot
/// and renders every chart bound to it. A failing collector is logged and
/// skipped until the next cycle; the others are unaffected. Cycles are
/// separated by a fixed sleep, so the cadence drifts by the time a cycle
/// takes.
///
/// # Example
///
/// ```ignore
/// let mut worker = Worker::new(Duration::from_secs(10), ProtocolWriter::stdout());
/// let collector = worker.add_collector(MemcachedCollector::new("127.0.0.1:11211"));
///
/// let mut chart = Chart::new("memcached", "items", "", "Items", "count", "cache", "memcached.items");
/// chart.add_dimension("curr_items", "current", DimensionAlgorithm::Absolute)?;
/// worker.add_chart(chart, Some(collector))?;
///
/// worker.run().await?;
/// ```
pub struct Worker<W> {
    interval: Duration,
    writer: ProtocolWriter<W>,
    buffer: ChartWriter,

    collectors: Vec<Box<dyn Collector>>,
    primary: Option<CollectorId>,
    bindings: Vec<Vec<String>>,
    charts: HashMap<String, Chart>,

    runs: u64,
    last_update: Option<Instant>,
    elapsed: Duration,
}

impl<W> Worker<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a worker with no collectors
    pub fn new(interval: Duration, writer: ProtocolWriter<W>) -> Self {
        Self {
            interval,
            writer,
            buffer: ChartWriter::new(),
            collectors: Vec::new(),
            primary: None,
            bindings: Vec::new(),
            charts: HashMap::new(),
            runs: 0,
            last_update: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a worker whose primary collector is `collector`
    pub fn with_collector<C>(interval: Duration, writer: ProtocolWriter<W>, collector: C) -> Self
    where
        C: Collector + 'static,
    {
        let mut worker = Self::new(interval, writer);
        worker.add_collector(collector);
        worker
    }

    /// Append the microseconds since the previous successful cycle to BEGIN lines.
    pub fn with_elapsed_on_begin(mut self, enabled: bool) -> Self {
        self.buffer = ChartWriter::new().with_collection_duration(enabled);
        self
    }

    /// Register a collector. The first one registered becomes the primary
    /// collector, used by [`Worker::add_chart`] when no collector is given.
    pub fn add_collector<C>(&mut self, collector: C) -> CollectorId
    where
        C: Collector + 'static,
    {
        let id = CollectorId(self.collectors.len());
        self.collectors.push(Box::new(collector));
        self.bindings.push(Vec::new());
        if self.primary.is_none() {
            self.primary = Some(id);
        }
        id
    }

    /// Register a collector and make it the primary one.
    pub fn set_collector<C>(&mut self, collector: C) -> CollectorId
    where
        C: Collector + 'static,
    {
        let id = self.add_collector(collector);
        self.primary = Some(id);
        id
    }

    /// Register a chart and bind it to `collector`, or to the primary
    /// collector when `None`. Returns the chart key.
    ///
    /// Adding a chart under an existing key replaces the previous chart and
    /// keeps its original binding.
    pub fn add_chart(
        &mut self,
        chart: Chart,
        collector: Option<CollectorId>,
    ) -> std::result::Result<String, ChartError> {
        let id = match collector.or(self.primary) {
            Some(id) if id.0 < self.collectors.len() => id,
            Some(id) => return Err(ChartError::UnknownCollector(id.0)),
            None => return Err(ChartError::UnknownCollector(0)),
        };
        Ok(self.bind(chart, id))
    }

    fn bind(&mut self, chart: Chart, id: CollectorId) -> String {
        let key = chart.key();
        if self.charts.insert(key.clone(), chart).is_some() {
            debug!(chart = %key, "chart registered again, replacing it");
        } else {
            self.bindings[id.0].push(key.clone());
        }
        key
    }

    /// Look up a chart by key (`<id>_<family>`)
    pub fn chart(&self, key: &str) -> Option<&Chart> {
        self.charts.get(key)
    }

    pub fn chart_mut(&mut self, key: &str) -> Option<&mut Chart> {
        self.charts.get_mut(key)
    }

    /// Keys of the charts bound to `collector`, in binding order
    pub fn bound_charts(&self, collector: CollectorId) -> &[String] {
        self.bindings
            .get(collector.0)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of cycles processed so far
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Duration of the last successful cycle plus the polling interval.
    pub fn since_last_run(&self) -> Duration {
        self.elapsed + self.interval
    }

    /// Run the polling loop forever.
    ///
    /// Only returns if writing to the output fails.
    pub async fn run(self) -> Result<()> {
        self.run_until(CancellationToken::new()).await
    }

    /// Run the polling loop until `token` is cancelled.
    ///
    /// Cancellation is observed between cycles; a collector call in flight
    /// is never interrupted.
    pub async fn run_until(mut self, token: CancellationToken) -> Result<()> {
        info!(
            interval = ?self.interval,
            collectors = self.collectors.len(),
            charts = self.charts.len(),
            "starting worker"
        );

        while !token.is_cancelled() {
            self.process().await?;

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(runs = self.runs, "worker stopped");
        Ok(())
    }

    /// Run a single collection cycle. Returns whether any chart was written.
    pub async fn process(&mut self) -> Result<bool> {
        let start = Instant::now();
        let since_update = self
            .last_update
            .map(|last| start.duration_since(last))
            .unwrap_or_default();

        let updated = self.update(since_update).await?;
        self.runs += 1;

        if updated {
            self.elapsed = start.elapsed();
            self.last_update = Some(start);
            debug!(elapsed = ?self.elapsed, runs = self.runs, "cycle complete");
        } else {
            debug!(runs = self.runs, "no charts updated");
        }

        Ok(updated)
    }

    async fn update(&mut self, since_update: Duration) -> Result<bool> {
        let mut updated = false;

        for index in 0..self.collectors.len() {
            let mut ctx = CollectContext::new(self.since_last_run());
            let collector = &mut self.collectors[index];
            let result = collector.collect(&mut ctx).await;
            let name = collector.name().to_string();

            for chart in ctx.into_charts() {
                self.bind(chart, CollectorId(index));
            }

            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(collector = %name, error = %e, "failed to update");
                    continue;
                }
            };

            if self.bindings[index].is_empty() {
                warn!(collector = %name, "no charts bound to collector");
                continue;
            }

            updated |= self.render(index, &snapshot, since_update).await?;
        }

        Ok(updated)
    }

    async fn render(&mut self, index: usize, snapshot: &Snapshot, since_update: Duration) -> Result<bool> {
        let mut updated = false;

        for key in &self.bindings[index] {
            let Some(chart) = self.charts.get_mut(key) else {
                continue;
            };
            if chart.update(snapshot, since_update, &mut self.buffer) {
                updated = true;
                // One write per chart keeps a declaration and its first block together
                self.writer.write_raw(self.buffer.buffer()).await?;
                self.buffer.clear();
            }
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DimensionAlgorithm;
    use async_trait::async_trait;
    use netdata_plugin_error::{CollectError, CollectResult};
    use std::sync::{Arc, Mutex};

    struct SharedCollector {
        data: Arc<Mutex<Snapshot>>,
    }

    #[async_trait]
    impl Collector for SharedCollector {
        fn name(&self) -> &str {
            "shared"
        }

        async fn collect(&mut self, _ctx: &mut CollectContext) -> CollectResult<Snapshot> {
            Ok(self.data.lock().unwrap().clone())
        }
    }

    struct FailingCollector;

    #[async_trait]
    impl Collector for FailingCollector {
        async fn collect(&mut self, _ctx: &mut CollectContext) -> CollectResult<Snapshot> {
            Err(CollectError::Timeout)
        }
    }

    fn chart(chart_type: &str, id: &str, family: &str, dims: &[&str]) -> Chart {
        let mut chart = Chart::new(chart_type, id, "", "Title", "units", family, "category");
        for dim in dims {
            chart
                .add_dimension(*dim, *dim, DimensionAlgorithm::Absolute)
                .unwrap();
        }
        chart
    }

    async fn take_output(writer: &ProtocolWriter<Vec<u8>>) -> String {
        let mut guard = writer.lock().await;
        String::from_utf8(std::mem::take(&mut *guard)).unwrap()
    }

    #[tokio::test]
    async fn test_add_chart_binds_to_primary_collector() {
        let writer = ProtocolWriter::new(Vec::new());
        let data = Arc::new(Mutex::new(Snapshot::new()));
        let mut worker = Worker::with_collector(
            Duration::from_millis(1),
            writer,
            SharedCollector { data },
        );

        let key = worker.add_chart(chart("t", "a", "fam", &["x"]), None).unwrap();
        assert_eq!(key, "a_fam");
        assert_eq!(worker.bound_charts(CollectorId(0)), ["a_fam".to_string()]);
        assert!(worker.chart("a_fam").is_some());
    }

    #[tokio::test]
    async fn test_add_chart_without_collector_fails() {
        let mut worker = Worker::new(Duration::from_millis(1), ProtocolWriter::new(Vec::new()));
        assert_eq!(
            worker.add_chart(chart("t", "a", "fam", &["x"]), None),
            Err(ChartError::UnknownCollector(0))
        );
        assert_eq!(
            worker.add_chart(chart("t", "a", "fam", &["x"]), Some(CollectorId(4))),
            Err(ChartError::UnknownCollector(4))
        );
    }

    #[tokio::test]
    async fn test_readding_a_chart_does_not_bind_twice() {
        let writer = ProtocolWriter::new(Vec::new());
        let data = Arc::new(Mutex::new(Snapshot::from([("x".to_string(), "1".to_string())])));
        let mut worker = Worker::with_collector(Duration::from_millis(1), writer.clone(), SharedCollector { data });

        worker.add_chart(chart("t", "a", "fam", &["x"]), None).unwrap();
        worker.add_chart(chart("t", "a", "fam", &["x"]), None).unwrap();
        worker.process().await.unwrap();

        let output = take_output(&writer).await;
        assert_eq!(output.matches("BEGIN t.a\n").count(), 1);
    }

    #[tokio::test]
    async fn test_failing_collector_is_isolated() {
        let writer = ProtocolWriter::new(Vec::new());
        let data = Arc::new(Mutex::new(Snapshot::from([("x".to_string(), "5".to_string())])));

        let mut worker = Worker::new(Duration::from_millis(1), writer.clone());
        let failing = worker.add_collector(FailingCollector);
        let healthy = worker.add_collector(SharedCollector { data });
        worker.add_chart(chart("t", "broken", "fam", &["x"]), Some(failing)).unwrap();
        worker.add_chart(chart("t", "ok", "fam", &["x"]), Some(healthy)).unwrap();

        assert!(worker.process().await.unwrap());

        let output = take_output(&writer).await;
        assert!(!output.contains("t.broken"));
        assert!(output.contains("BEGIN t.ok\nSET 'x' = 5\nEND\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_since_last_run_tracks_cycle_duration() {
        struct SlowCollector;

        #[async_trait]
        impl Collector for SlowCollector {
            async fn collect(&mut self, _ctx: &mut CollectContext) -> CollectResult<Snapshot> {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok(Snapshot::from([("x".to_string(), "1".to_string())]))
            }
        }

        let mut worker = Worker::with_collector(
            Duration::from_secs(10),
            ProtocolWriter::new(Vec::new()),
            SlowCollector,
        );
        worker.add_chart(chart("t", "a", "fam", &["x"]), None).unwrap();

        assert_eq!(worker.since_last_run(), Duration::from_secs(10));
        worker.process().await.unwrap();
        assert_eq!(worker.since_last_run(), Duration::from_secs(13));
        assert_eq!(worker.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_on_begin() {
        let writer = ProtocolWriter::new(Vec::new());
        let data = Arc::new(Mutex::new(Snapshot::from([("x".to_string(), "1".to_string())])));
        let mut worker = Worker::with_collector(Duration::from_secs(1), writer.clone(), SharedCollector { data })
            .with_elapsed_on_begin(true);
        worker.add_chart(chart("t", "a", "fam", &["x"]), None).unwrap();

        worker.process().await.unwrap();
        assert!(take_output(&writer).await.contains("BEGIN t.a\n"));

        tokio::time::advance(Duration::from_secs(2)).await;
        worker.process().await.unwrap();
        assert!(take_output(&writer).await.contains("BEGIN t.a 2000000\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stops_between_cycles() {
        let writer = ProtocolWriter::new(Vec::new());
        let data = Arc::new(Mutex::new(Snapshot::from([("x".to_string(), "1".to_string())])));
        let mut worker = Worker::with_collector(Duration::from_secs(1), writer.clone(), SharedCollector { data });
        worker.add_chart(chart("t", "a", "fam", &["x"]), None).unwrap();

        let token = CancellationToken::new();
        let handle = tokio::spawn(worker.run_until(token.clone()));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        let output = take_output(&writer).await;
        assert_eq!(output.matches("BEGIN t.a\n").count(), 4);
        assert_eq!(output.matches("CHART t.a").count(), 1);
    }
}
