//! zookeeper.plugin library - can be called from multi-call binaries or standalone

use anyhow::{Context, Result};
use clap::Parser;
use rt::{NetdataEnv, ProtocolWriter, RetryLoop};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod collector;
pub mod plugin_config;

use crate::plugin_config::{Cli, PluginConfig};

/// Entry point for zookeeper.plugin
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

    rt::init_tracing("zookeeper.plugin", "info");

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

    let targets: Arc<[String]> = config.targets.into();
    let ns: Arc<str> = config.ns.into();

    let mut retry = RetryLoop::new(config.interval, ProtocolWriter::stdout())
        .with_prefix(config.prefix)
        .with_max_cycles(config.max_cycles);

    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    // Exiting after max_cycles lets netdata restart the plugin with fresh config
    let stats = retry
        .run_until(token, move |sink| {
            collector::collect(sink, Arc::clone(&targets), Arc::clone(&ns))
        })
        .await
        .context("failed to write chart updates")?;

    tracing::info!(
        cycles = stats.cycles,
        failures = stats.failures,
        "zookeeper collection stopped"
    );
    Ok(())
}
