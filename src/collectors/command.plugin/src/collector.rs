//! Runs shell commands and turns their output into chart values.
//!
//! A command whose trimmed output is a number feeds chart `cmd_<name>`
//! with that number. Any other output (or any output, for commands marked
//! `value_is_label`) is a label: it feeds chart `cmd_<name>_<output>` with
//! the unix time of the run, so the chart title shows the label and the
//! value shows when it was last seen.

use crate::plugin_config::CommandSpec;
use async_trait::async_trait;
use netdata_plugin_error::{CollectError, CollectResult};
use rt::{Chart, ChartMetadata, CollectContext, Collector, DimensionAlgorithm, DimensionMetadata, Snapshot};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::process::Command;
use tracing::{debug, warn};

struct CommandState {
    spec: CommandSpec,
    interval: Duration,
    wait: Duration,
    /// Key of the last output, which is also the key its chart reads
    key: Option<String>,
}

pub struct CommandCollector {
    commands: Vec<CommandState>,
    timeout: Duration,
    data: Snapshot,
}

impl CommandCollector {
    pub fn new(commands: Vec<CommandSpec>, command_interval: Duration, timeout: Duration) -> Self {
        let commands = commands
            .into_iter()
            .map(|spec| CommandState {
                interval: spec.interval.unwrap_or(command_interval),
                spec,
                wait: Duration::ZERO,
                key: None,
            })
            .collect();

        Self {
            commands,
            timeout,
            data: Snapshot::new(),
        }
    }

    fn chart_for(spec: &CommandSpec, key: &str) -> Chart {
        let metadata = ChartMetadata {
            chart_type: rt::sanitize(key),
            id: spec.name.clone(),
            name: String::new(),
            title: spec.title().to_string(),
            units: String::new(),
            family: spec.family.clone(),
            category: "command".to_string(),
        };
        let dimension = DimensionMetadata::new(key, spec.name.as_str(), DimensionAlgorithm::Absolute);

        let mut chart = Chart::with_dimensions(metadata, [dimension]);
        chart.set_dynamic_dimensions(false);
        chart
    }
}

/// Run `command` with bash and return its trimmed stdout.
pub async fn run_command(command: &str, timeout: Duration) -> CollectResult<String> {
    let output = tokio::time::timeout(
        timeout,
        Command::new("/bin/bash").arg("-c").arg(command).kill_on_drop(true).output(),
    )
    .await
    .map_err(|_| CollectError::Timeout)??;

    if !output.status.success() {
        return Err(CollectError::Command {
            command: command.to_string(),
            message: output.status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .trim_end_matches('\n')
        .trim_matches(' ')
        .to_string())
}

fn unix_time() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}

#[async_trait]
impl Collector for CommandCollector {
    fn name(&self) -> &str {
        "command"
    }

    async fn collect(&mut self, ctx: &mut CollectContext) -> CollectResult<Snapshot> {
        let since_last_run = ctx.since_last_run();

        for state in self.commands.iter_mut() {
            state.wait = state.wait.saturating_sub(since_last_run);
            if !state.wait.is_zero() {
                continue;
            }
            state.wait = state.interval;

            let output = match run_command(&state.spec.command, self.timeout).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(command = %state.spec.name, error = %e, "command failed");
                    continue;
                }
            };

            let is_number = !output.is_empty() && output.parse::<f64>().is_ok();
            let (key, value) = if is_number && !state.spec.value_is_label {
                (format!("cmd_{}", state.spec.name), output)
            } else {
                (format!("cmd_{}_{}", state.spec.name, output), unix_time())
            };

            // Every chart of a command shares one worker key, so a new
            // output replaces the chart of the previous one.
            let previous = state.key.replace(key.clone());
            if previous.as_deref() != Some(key.as_str()) {
                if let Some(previous) = previous {
                    self.data.remove(&previous);
                }
                debug!(command = %state.spec.name, chart = %key, "new command chart");
                ctx.add_chart(Self::chart_for(&state.spec, &key));
            }
            self.data.insert(key, value);
        }

        Ok(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, command: &str) -> CommandSpec {
        CommandSpec::new(name, command)
    }

    async fn collect(collector: &mut CommandCollector, since_last_run: Duration) -> (Snapshot, Vec<Chart>) {
        let mut ctx = CollectContext::new(since_last_run);
        let data = collector.collect(&mut ctx).await.unwrap();
        (data, ctx.pending_charts().to_vec())
    }

    #[tokio::test]
    async fn test_numbers_and_labels() {
        let mut labelled = spec("test31", "echo '1.2'");
        labelled.value_is_label = true;

        let mut collector = CommandCollector::new(
            vec![
                spec("test10", "echo '1.2.3'"),
                spec("test30", "echo '1.2'"),
                labelled,
                spec("broken", "exit 3"),
            ],
            Duration::from_secs(1),
            Duration::from_secs(10),
        );

        let (data, charts) = collect(&mut collector, Duration::from_secs(1000)).await;
        assert!(data.contains_key("cmd_test10_1.2.3"));
        assert_eq!(data["cmd_test30"], "1.2");
        assert!(data.contains_key("cmd_test31_1.2"));
        assert_eq!(data.len(), 3);

        assert_eq!(charts.len(), 3);
        let chart = charts.iter().find(|c| c.metadata().id == "test10").unwrap();
        assert_eq!(chart.metadata().chart_type, "cmd_test10_1_2_3");
        assert_eq!(chart.metadata().category, "command");
        assert!(chart.has_dimension("cmd_test10_1.2.3"));

        // charts are only registered once
        let (_, charts) = collect(&mut collector, Duration::from_secs(1000)).await;
        assert!(charts.is_empty());
    }

    #[tokio::test]
    async fn test_interval_keeps_previous_value() {
        let mut slow = spec("test21", "date +%N");
        slow.interval = Some(Duration::from_secs(10));

        let mut collector = CommandCollector::new(
            vec![spec("test20", "date +%N"), slow],
            Duration::from_secs(1),
            Duration::from_secs(10),
        );

        let (first, _) = collect(&mut collector, Duration::from_secs(2)).await;
        let (second, _) = collect(&mut collector, Duration::from_secs(2)).await;

        assert_ne!(first["cmd_test20"], second["cmd_test20"]);
        assert_eq!(first["cmd_test21"], second["cmd_test21"]);
    }

    #[tokio::test]
    async fn test_changing_label_replaces_key() {
        let mut collector = CommandCollector::new(
            vec![spec("test40", "echo -n 'v'; date +%N")],
            Duration::from_secs(1),
            Duration::from_secs(10),
        );

        collect(&mut collector, Duration::from_secs(2)).await;
        let (data, charts) = collect(&mut collector, Duration::from_secs(2)).await;

        assert_eq!(data.keys().filter(|k| k.starts_with("cmd_test40")).count(), 1);
        assert_eq!(charts.len(), 1);
    }

    #[tokio::test]
    async fn test_run_command_errors() {
        let err = run_command("exit 2", Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, CollectError::Command { .. }));

        let err = run_command("sleep 5", Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, CollectError::Timeout));

        assert_eq!(run_command("echo ' up 3 days '", Duration::from_secs(5)).await.unwrap(), "up 3 days");
    }
}
