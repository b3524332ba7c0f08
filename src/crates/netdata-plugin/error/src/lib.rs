use thiserror::Error;

/// Result type for netdata plugin operations
pub type Result<T> = std::result::Result<T, NetdataPluginError>;

/// Result type returned by collectors
pub type CollectResult<T> = std::result::Result<T, CollectError>;

/// Error types that can occur while running a netdata plugin
#[derive(Error, Debug)]
pub enum NetdataPluginError {
    /// Writing to the protocol output failed
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    /// A collection cycle failed
    #[error("collection error: {0}")]
    Collect(#[from] CollectError),

    /// Chart registration or binding error
    #[error("chart error: {0}")]
    Chart(#[from] ChartError),

    /// Configuration error
    #[error("configuration error: {message}")]
    Config { message: String },
}

/// Errors produced by a single collector call.
///
/// Every variant is isolated to the collector that raised it; the scheduler
/// logs it and moves on to the next collector.
#[derive(Error, Debug)]
pub enum CollectError {
    /// Dial failure, reset connection, short read
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The upstream did not answer within the collector's deadline
    #[error("timeout elapsed")]
    Timeout,

    /// The upstream answered with something we could not parse
    #[error("decode error: {message}")]
    Decode { message: String },

    /// An external command exited unsuccessfully
    #[error("command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// Generic error with custom message
    #[error("{message}")]
    Other { message: String },
}

impl CollectError {
    pub fn decode(message: impl Into<String>) -> Self {
        CollectError::Decode {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        CollectError::Other {
            message: message.into(),
        }
    }
}

/// Errors raised while building the chart registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    /// A dimension id was added twice to the same chart
    #[error("dimension '{dimension}' already exists in chart '{chart}'")]
    DuplicateDimension { chart: String, dimension: String },

    /// A chart was bound to a collector that is not registered
    #[error("no collector registered with id {0}")]
    UnknownCollector(usize),
}
