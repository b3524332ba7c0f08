use command_plugin::collector::CommandCollector;
use command_plugin::plugin_config::CommandSpec;
use rt::{ProtocolWriter, Worker};
use std::time::Duration;

#[tokio::test]
async fn test_command_charts_are_declared_on_first_output() {
    let mut kernel = CommandSpec::new("kernel", "echo 5.10.0-amd64");
    kernel.family = "system".to_string();
    kernel.desc = Some("Kernel version".to_string());

    let writer = ProtocolWriter::new(Vec::new());
    let mut worker = Worker::new(Duration::from_secs(10), writer.clone());
    let collector = worker.set_collector(CommandCollector::new(
        vec![kernel, CommandSpec::new("answer", "echo 42")],
        Duration::from_secs(10),
        Duration::from_secs(5),
    ));

    assert!(worker.process().await.unwrap());
    assert_eq!(worker.bound_charts(collector).len(), 2);

    let output = String::from_utf8(std::mem::take(&mut *writer.lock().await)).unwrap();
    assert!(output.contains(
        "CHART cmd_kernel_5_10_0-amd64.kernel '' 'Kernel version' '' 'system' 'command'\n\
         DIMENSION 'cmd_kernel_5.10.0-amd64' 'kernel' absolute\n\
         BEGIN cmd_kernel_5_10_0-amd64.kernel\n"
    ));
    assert!(output.contains(
        "CHART cmd_answer.answer '' 'echo 42' '' 'commands' 'command'\n\
         DIMENSION 'cmd_answer' 'answer' absolute\n\
         BEGIN cmd_answer.answer\n\
         SET 'cmd_answer' = 42\n\
         END\n"
    ));
    assert!(worker.chart("kernel_system").is_some());

    // same outputs, so nothing is declared again
    assert!(worker.process().await.unwrap());
    let output = String::from_utf8(std::mem::take(&mut *writer.lock().await)).unwrap();
    assert!(!output.contains("CHART"));
    assert!(output.contains("BEGIN cmd_answer.answer\nSET 'cmd_answer' = 42\nEND\n"));
}

#[tokio::test]
async fn test_label_returning_to_an_earlier_value_keeps_reporting() {
    let state = tempfile::NamedTempFile::new().unwrap();
    let command = format!("cat {}", state.path().display());

    let writer = ProtocolWriter::new(Vec::new());
    let mut worker = Worker::new(Duration::from_secs(10), writer.clone());
    worker.set_collector(CommandCollector::new(
        vec![CommandSpec::new("svc", command)],
        Duration::from_secs(10),
        Duration::from_secs(5),
    ));

    for (label, declared) in [("up", true), ("down", true), ("up", true), ("up", false)] {
        std::fs::write(state.path(), label).unwrap();
        assert!(worker.process().await.unwrap(), "no update for {label}");

        let output = String::from_utf8(std::mem::take(&mut *writer.lock().await)).unwrap();
        let chart = format!("cmd_svc_{label}.svc");
        assert_eq!(output.contains(&format!("CHART {chart} ")), declared, "{output}");
        assert!(output.contains(&format!("BEGIN {chart}\nSET 'cmd_svc_{label}' = ")), "{output}");
    }
}
