//! Scrapes `stats` from one memcached instance.

use async_trait::async_trait;
use netdata_plugin_error::{CollectError, CollectResult};
use rt::{CollectContext, Collector, RateTracker, Snapshot};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Counters in `stats` that hold cumulative CPU seconds.
const CPU_COUNTERS: &[(&str, &str)] = &[("rusage_user", "cpu_user"), ("rusage_system", "cpu_system")];

pub struct MemcachedCollector {
    addr: String,
    timeout: Duration,
    rates: RateTracker,
}

impl MemcachedCollector {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            rates: RateTracker::new(),
        }
    }

    async fn stats(&self) -> CollectResult<Snapshot> {
        let stream = TcpStream::connect(&self.addr).await?;
        let (read, mut write) = stream.into_split();
        write.write_all(b"stats\r\n").await?;

        let mut lines = BufReader::new(read).lines();
        let mut stats = Snapshot::new();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim_end();
            if line == "END" {
                return Ok(stats);
            }
            if let Some((key, value)) = parse_stat(line)? {
                stats.insert(key.to_string(), value.to_string());
            }
        }
        Err(CollectError::decode("connection closed before END"))
    }

    /// Add `cpu_user` and `cpu_system`, in percent of one core.
    fn add_cpu(&mut self, stats: &mut Snapshot, at: Instant) {
        for (counter, key) in CPU_COUNTERS {
            let Some(seconds) = stats.get(*counter).and_then(|v| v.parse::<f64>().ok()) else {
                continue;
            };
            let series = format!("{}/{}", self.addr, counter);
            if let Some(rate) = self.rates.rate(&series, seconds, at) {
                stats.insert(key.to_string(), format!("{}", (rate * 100.0).round() as u64));
            }
        }
    }
}

/// Parse one `STAT <name> <value>` line. Blank lines are skipped.
fn parse_stat(line: &str) -> CollectResult<Option<(&str, &str)>> {
    if line.is_empty() {
        return Ok(None);
    }
    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("STAT"), Some(key), Some(value)) => Ok(Some((key, value.trim()))),
        _ => Err(CollectError::decode(format!("unexpected line: {}", line))),
    }
}

#[async_trait]
impl Collector for MemcachedCollector {
    fn name(&self) -> &str {
        &self.addr
    }

    async fn collect(&mut self, _ctx: &mut CollectContext) -> CollectResult<Snapshot> {
        let mut stats = tokio::time::timeout(self.timeout, self.stats())
            .await
            .map_err(|_| CollectError::Timeout)??;
        self.add_cpu(&mut stats, Instant::now());
        Ok(stats)
    }
}
