//! A runtime for building netdata external plugins that poll other services.
//!
//! A plugin reads the state of some service every few seconds and prints it
//! to stdout using netdata's line protocol:
//!
//! ```text
//! CHART <type>.<id> '<name>' '<title>' '<units>' '<family>' '<category>'
//! DIMENSION '<dim-id>' '<dim-name>' <absolute|incremental>
//! BEGIN <type>.<id>
//! SET '<dim-id>' = <value>
//! END
//! ```
//!
//! This crate keeps the state that has to survive between polling cycles
//! (which charts and dimensions netdata already knows about) and offers two
//! drivers:
//!
//! - [`Worker`] polls [`Collector`]s that return a full [`Snapshot`] per
//!   call, and renders every [`Chart`] bound to each of them.
//! - [`RetryLoop`] runs a function that pushes [`Metric`]s into a
//!   [`MetricSink`], possibly from many producer tasks, declares charts on
//!   the fly and backs off exponentially while the function keeps failing.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use netdata_plugin_error::CollectResult;
//! use rt::{Chart, CollectContext, Collector, DimensionAlgorithm, ProtocolWriter, Snapshot, Worker};
//! use std::time::Duration;
//!
//! struct Uptime;
//!
//! #[async_trait]
//! impl Collector for Uptime {
//!     async fn collect(&mut self, _ctx: &mut CollectContext) -> CollectResult<Snapshot> {
//!         Ok(Snapshot::from([("uptime".to_string(), "42".to_string())]))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     rt::init_tracing("uptime.plugin", "info");
//!
//!     let mut worker = Worker::new(Duration::from_secs(10), ProtocolWriter::stdout());
//!     let uptime = worker.add_collector(Uptime);
//!
//!     let mut chart = Chart::new("system", "uptime", "", "Uptime", "seconds", "uptime", "system.uptime");
//!     chart.add_dimension("uptime", "uptime", DimensionAlgorithm::Absolute)?;
//!     worker.add_chart(chart, Some(uptime))?;
//!
//!     worker.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency Model
//!
//! One driver task owns all chart state. Collectors of a [`Worker`] are
//! called one after the other; a [`RetryLoop`] collect function may fan out
//! to any number of tasks, which only ever talk to the driver through the
//! bounded metric channel. All output goes through a [`ProtocolWriter`],
//! whose writes are serialized so a chart declaration and its first update
//! always reach netdata together.

// Charts module and re-exports
pub mod charts;
pub use charts::{Chart, ChartMetadata, ChartWriter, DimensionAlgorithm, DimensionMetadata};

mod collector;
pub use collector::{CollectContext, Collector, CollectorId, Snapshot};

mod output;
pub use output::ProtocolWriter;

mod worker;
pub use worker::Worker;

pub mod retry;
pub use retry::{Metric, MetricRegistry, MetricSink, RetryLoop, RetryStats};

mod rate;
pub use rate::RateTracker;

mod ids;
pub use ids::{account_id, sanitize, sid};

pub mod config;
pub use config::{parse_interval_seconds, read_key_value_conf};

// Netdata environment utilities
pub mod netdata_env;
pub use netdata_env::{LogLevel, NetdataEnv};

// Tracing initialization
mod tracing_setup;
pub use tracing_setup::init_tracing;

pub use netdata_plugin_error::{ChartError, CollectError, CollectResult, NetdataPluginError, Result};
