//! Static description of charts and their dimensions.

use std::fmt;

/// How netdata interprets the values of a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DimensionAlgorithm {
    /// Store the value as-is
    #[default]
    Absolute,
    /// Counter; netdata derives the rate from consecutive values
    Incremental,
}

impl DimensionAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionAlgorithm::Absolute => "absolute",
            DimensionAlgorithm::Incremental => "incremental",
        }
    }
}

impl fmt::Display for DimensionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionMetadata {
    /// Key looked up in snapshots and written on SET lines
    pub id: String,
    pub name: String,
    pub algorithm: DimensionAlgorithm,
}

impl DimensionMetadata {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        algorithm: DimensionAlgorithm,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            algorithm,
        }
    }
}

/// Metadata for a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartMetadata {
    /// Chart type, the part before the dot in `type.id`
    pub chart_type: String,
    /// Chart ID, the part after the dot in `type.id`
    pub id: String,
    pub name: String,
    pub title: String,
    /// Units for the chart
    pub units: String,
    /// Family grouping
    pub family: String,
    /// Category (netdata context)
    pub category: String,
}

impl ChartMetadata {
    /// The identifier used on BEGIN and CHART lines.
    pub fn full_id(&self) -> String {
        format!("{}.{}", self.chart_type, self.id)
    }

    /// The key under which a worker registers this chart.
    pub fn key(&self) -> String {
        format!("{}_{}", self.id, self.family)
    }
}
