//! command.plugin library - can be called from multi-call binaries or standalone

use anyhow::{Context, Result};
use clap::Parser;
use rt::{NetdataEnv, ProtocolWriter, Worker};
use tokio_util::sync::CancellationToken;

pub mod collector;
pub mod plugin_config;

use crate::collector::CommandCollector;
use crate::plugin_config::{Cli, PluginConfig};

/// Entry point for command.plugin
///
/// # Arguments
/// * `args` - Command-line arguments, including argv[0]
///
/// # Returns
/// Exit code (0 for success, non-zero for errors)
pub fn run(args: Vec<String>) -> i32 {
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    rt::init_tracing("command.plugin", "info");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start tokio runtime: {}", e);
            return 1;
        }
    };

    match runtime.block_on(run_internal(cli)) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    }
}

async fn run_internal(cli: Cli) -> Result<()> {
    let config = PluginConfig::resolve(cli, &NetdataEnv::from_environment())
        .context("failed to initialize plugin configuration")?;

    // Charts are registered by the collector as command outputs show up
    let mut worker = Worker::new(config.interval, ProtocolWriter::stdout());
    worker.set_collector(CommandCollector::new(
        config.commands,
        config.command_interval,
        config.timeout,
    ));

    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    worker.run_until(token).await.context("failed to write chart updates")
}
