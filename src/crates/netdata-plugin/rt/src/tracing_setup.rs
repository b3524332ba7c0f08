//! Tracing configuration for netdata plugins
//!
//! stdout carries the chart protocol, so logs go either to the systemd
//! journal (when netdata exports NETDATA_SYSTEMD_JOURNAL_PATH) or to stderr,
//! which netdata captures into its collector log.

use crate::netdata_env::NetdataEnv;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Output destination for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogOutput {
    Journal,
    Stderr,
}

impl LogOutput {
    fn detect(env: &NetdataEnv) -> Self {
        if env.systemd_journal_path.is_some() {
            LogOutput::Journal
        } else {
            LogOutput::Stderr
        }
    }
}

/// Pick the filter directive: `RUST_LOG`, then `NETDATA_LOG_LEVEL`, then
/// `default_filter`.
fn filter_directive(rust_log: Option<String>, env: &NetdataEnv, default_filter: &str) -> String {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .or_else(|| env.log_level.map(|level| level.as_filter().to_string()))
        .unwrap_or_else(|| default_filter.to_string())
}

/// Initialize tracing for `plugin`.
///
/// Does nothing if a global subscriber is already installed. Falls back to
/// stderr if the journal socket cannot be opened.
pub fn init_tracing(plugin: &str, default_filter: &str) {
    let env = NetdataEnv::from_environment();
    let directive = filter_directive(std::env::var("RUST_LOG").ok(), &env, default_filter);
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let stderr_layer = || {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false)
    };

    let output = match LogOutput::detect(&env) {
        LogOutput::Journal => match tracing_journald::layer() {
            Ok(layer) => {
                let _ = registry.with(layer.with_syslog_identifier(plugin.to_string())).try_init();
                LogOutput::Journal
            }
            Err(e) => {
                let _ = registry.with(stderr_layer()).try_init();
                tracing::warn!(error = %e, "cannot connect to journald, logging to stderr");
                LogOutput::Stderr
            }
        },
        LogOutput::Stderr => {
            let _ = registry.with(stderr_layer()).try_init();
            LogOutput::Stderr
        }
    };

    tracing::debug!(plugin, output = ?output, filter = %directive, "tracing initialized");
}
