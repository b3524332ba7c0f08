//! Scrapes `mntr` from zookeeper servers, one producer task per server.

use netdata_plugin_error::{CollectError, CollectResult};
use rt::MetricSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::warn;

/// Read the `mntr` report of one server as `(stat, value)` pairs.
///
/// Tab-separated lines with a numeric value are kept; the rest
/// (`zk_version`, `zk_server_state`, blank lines) is skipped.
pub async fn mntr(addr: &str) -> CollectResult<Vec<(String, String)>> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(b"mntr\n").await?;

    let mut lines = BufReader::new(stream).lines();
    let mut stats = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let mut fields = line.split('\t');
        let (Some(key), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
            continue;
        };
        let value = value.trim();
        if value.parse::<f64>().is_ok() {
            stats.push((key.to_string(), value.to_string()));
        }
    }

    if stats.is_empty() {
        return Err(CollectError::decode(format!("{}: empty mntr report", addr)));
    }
    Ok(stats)
}

/// Scrape every target concurrently and push one metric per stat:
/// chart = stat name, dimension = `<ns>.<target>`.
///
/// Fails only when no target could be scraped.
pub async fn collect(sink: MetricSink, targets: Arc<[String]>, ns: Arc<str>) -> CollectResult<()> {
    let timeout = sink.deadline().remaining().max(Duration::from_millis(1));

    let mut tasks = Vec::with_capacity(targets.len());
    for target in targets.iter().cloned() {
        let sink = sink.clone();
        let ns = Arc::clone(&ns);
        tasks.push(tokio::spawn(async move {
            let stats = tokio::time::timeout(timeout, mntr(&target))
                .await
                .map_err(|_| CollectError::Timeout)??;

            let dim = rt::sid(&target, &ns, None);
            for (stat, value) in stats {
                sink.update(stat, dim.as_str(), value).await;
            }
            Ok::<_, CollectError>(())
        }));
    }
    drop(sink);

    let mut failed = 0;
    let mut last_error = None;
    for (task, target) in tasks.into_iter().zip(targets.iter()) {
        let result = task
            .await
            .map_err(|e| CollectError::other(e.to_string()))
            .and_then(|result| result);
        if let Err(e) = result {
            warn!(target = %target, error = %e, "failed to scrape zookeeper");
            failed += 1;
            last_error = Some(e);
        }
    }

    match last_error {
        Some(e) if failed == targets.len() => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    pub(crate) async fn fake_zookeeper(report: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            while let Ok((mut conn, _)) = listener.accept().await {
                let mut request = [0u8; 5];
                if conn.read_exact(&mut request).await.is_err() || &request != b"mntr\n" {
                    continue;
                }
                let _ = conn.write_all(report.as_bytes()).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_mntr() {
        let addr = fake_zookeeper(
            "zk_version\t3.4.13-2d71af4dbe22557fda74f9a9b4309b15a7487f03\n\
             zk_avg_latency\t0\n\
             zk_packets_received\t70\n\
             zk_server_state\tstandalone\n\
             zk_znode_count\t4\n",
        )
        .await;

        let stats = mntr(&addr).await.unwrap();
        assert_eq!(
            stats,
            vec![
                ("zk_avg_latency".to_string(), "0".to_string()),
                ("zk_packets_received".to_string(), "70".to_string()),
                ("zk_znode_count".to_string(), "4".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(mntr(&addr).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_report_is_an_error() {
        let addr = fake_zookeeper("This ZooKeeper instance is not currently serving requests\n").await;
        let err = mntr(&addr).await.unwrap_err();
        assert!(matches!(err, CollectError::Decode { .. }));
    }
}
