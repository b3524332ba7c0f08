//! Chart and dimension registry for netdata external plugins.
//!
//! A [`Chart`] remembers which dimensions it has and whether netdata has seen
//! its declaration. Updates are rendered into a [`ChartWriter`] buffer, which
//! the drivers hand to the shared output in one write.

mod chart;
mod metadata;
mod writer;

// Re-export public API
pub use chart::Chart;
pub use metadata::{ChartMetadata, DimensionAlgorithm, DimensionMetadata};
pub use writer::ChartWriter;
