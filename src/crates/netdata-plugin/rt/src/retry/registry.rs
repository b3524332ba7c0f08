//! Charts declared on the fly from drained metrics.

use super::sink::Metric;
use crate::charts::{Chart, ChartWriter, DimensionAlgorithm};
use crate::collector::Snapshot;
use std::collections::HashMap;
use std::time::Duration;

const FAMILIES: &[(&str, &str)] = &[
    ("req", "Request"),
    ("rep", "Response"),
    ("score", "Score"),
    ("byte", "Capacity"),
    ("inodes", "Inodes"),
    ("cnx", "Connections"),
    ("zk", "Zookeeper"),
    ("container", "Container"),
    ("account", "Account"),
];

/// Charts seen by a retry loop, owned by that loop.
///
/// Metric chart names are normalized to `<prefix>.<name>` with dots in the
/// name replaced by underscores. A chart is declared the first time one of
/// its metrics is rendered and declared again whenever a metric names a
/// dimension it has not seen. Every dimension is absolute.
#[derive(Debug)]
pub struct MetricRegistry {
    prefix: String,
    charts: HashMap<String, Chart>,
}

impl MetricRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            charts: HashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full chart name (`<prefix>.<id>`) for a metric chart name.
    pub fn chart_name(&self, chart: &str) -> String {
        format!("{}.{}", self.prefix, chart.replace('.', "_"))
    }

    pub fn chart(&self, chart: &str) -> Option<&Chart> {
        self.charts.get(&chart.replace('.', "_"))
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// Render one BEGIN/SET/END block per chart that received metrics,
    /// preceded by its declaration when needed. Charts are rendered in the
    /// order their first metric arrived. Returns the number of blocks.
    pub fn render<I>(&mut self, metrics: I, writer: &mut ChartWriter) -> usize
    where
        I: IntoIterator<Item = Metric>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut batches: HashMap<String, (Vec<String>, Snapshot)> = HashMap::new();

        for metric in metrics {
            let id = metric.chart.replace('.', "_");
            let (dims, values) = batches.entry(id.clone()).or_insert_with(|| {
                order.push(id);
                (Vec::new(), Snapshot::new())
            });
            if values.insert(metric.dim.clone(), metric.value).is_none() {
                dims.push(metric.dim);
            }
        }

        let mut rendered = 0;
        for id in order {
            let Some((dims, values)) = batches.remove(&id) else {
                continue;
            };
            let chart = self
                .charts
                .entry(id.clone())
                .or_insert_with(|| new_chart(&self.prefix, &id));

            let mut extended = false;
            for dim in dims {
                if chart.add_dimension(dim.clone(), dim, DimensionAlgorithm::Absolute).is_ok() {
                    extended = true;
                }
            }
            if extended && chart.is_declared() {
                chart.redeclare();
            }

            if chart.update(&values, Duration::ZERO, writer) {
                rendered += 1;
            }
        }
        rendered
    }
}

fn new_chart(prefix: &str, id: &str) -> Chart {
    let title = id.split('_').collect::<Vec<_>>().join(" ").to_uppercase();
    let mut chart = Chart::new(prefix, id, "", title, "", family(id), "");
    chart.set_dynamic_dimensions(false);
    chart
}

/// Family for a chart id, from the leading part of its name.
pub fn family(id: &str) -> &'static str {
    FAMILIES
        .iter()
        .find(|(prefix, _)| id.starts_with(prefix))
        .map(|(_, family)| *family)
        .unwrap_or("Misc")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(registry: &mut MetricRegistry, metrics: Vec<Metric>) -> String {
        let mut writer = ChartWriter::new();
        registry.render(metrics, &mut writer);
        String::from_utf8_lossy(writer.buffer()).into_owned()
    }

    #[test]
    fn test_first_metric_declares_chart() {
        let mut registry = MetricRegistry::new("openio");
        let output = render(
            &mut registry,
            vec![Metric::new("req.get", "OPENIO.rawx_1", "12")],
        );

        assert_eq!(
            output,
            "CHART openio.req_get '' 'REQ GET' '' 'Request' ''\n\
             DIMENSION 'OPENIO.rawx_1' 'OPENIO.rawx_1' absolute\n\
             BEGIN openio.req_get\n\
             SET 'OPENIO.rawx_1' = 12\n\
             END\n"
        );
        assert_eq!(registry.chart_name("req.get"), "openio.req_get");
        assert!(registry.chart("req.get").is_some());
    }

    #[test]
    fn test_new_dimension_redeclares_chart() {
        let mut registry = MetricRegistry::new("openio");
        render(&mut registry, vec![Metric::new("score", "a", "1")]);

        let output = render(
            &mut registry,
            vec![Metric::new("score", "a", "2"), Metric::new("score", "b", "3")],
        );
        assert!(output.starts_with("CHART openio.score '' 'SCORE' '' 'Score' ''\n"));
        assert!(output.contains("DIMENSION 'a' 'a' absolute\nDIMENSION 'b' 'b' absolute\n"));
        assert!(output.ends_with("BEGIN openio.score\nSET 'a' = 2\nSET 'b' = 3\nEND\n"));

        let output = render(&mut registry, vec![Metric::new("score", "b", "4")]);
        assert_eq!(output, "BEGIN openio.score\nSET 'b' = 4\nEND\n");
    }

    #[test]
    fn test_one_block_per_chart() {
        let mut registry = MetricRegistry::new("openio");
        let mut writer = ChartWriter::new();
        let blocks = registry.render(
            vec![
                Metric::new("byte_used", "v1", "10"),
                Metric::new("inodes_used", "v1", "3"),
                Metric::new("byte_used", "v2", "20"),
                Metric::new("byte_used", "v1", "11"),
            ],
            &mut writer,
        );
        assert_eq!(blocks, 2);
        assert_eq!(registry.len(), 2);

        let output = String::from_utf8_lossy(writer.buffer()).into_owned();
        assert_eq!(output.matches("BEGIN ").count(), 2);
        assert!(output.contains("BEGIN openio.byte_used\nSET 'v1' = 11\nSET 'v2' = 20\nEND\n"));
    }

    #[test]
    fn test_prefixed_dimension_names_are_not_split() {
        let mut registry = MetricRegistry::new("openio");
        render(&mut registry, vec![Metric::new("zk", "zk_latency", "1")]);

        let chart = registry.chart("zk").unwrap();
        assert_eq!(chart.dimensions().len(), 1);
        assert!(chart.has_dimension("zk_latency"));
    }

    #[test]
    fn test_dimension_only_reads_its_own_metric() {
        let mut registry = MetricRegistry::new("openio");
        render(
            &mut registry,
            vec![Metric::new("zk", "latency", "1"), Metric::new("zk", "zk_latency", "2")],
        );

        let output = render(&mut registry, vec![Metric::new("zk", "zk_latency", "5")]);
        assert_eq!(output, "BEGIN openio.zk\nSET 'zk_latency' = 5\nEND\n");
    }

    #[test]
    fn test_family_lookup() {
        assert_eq!(family("req_get"), "Request");
        assert_eq!(family("cnx_client"), "Connections");
        assert_eq!(family("unknown"), "Misc");
    }
}
