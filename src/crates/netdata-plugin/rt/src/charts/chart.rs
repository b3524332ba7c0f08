//! Chart state held across polling cycles.

use super::metadata::{ChartMetadata, DimensionAlgorithm, DimensionMetadata};
use super::writer::ChartWriter;
use crate::collector::Snapshot;
use netdata_plugin_error::ChartError;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

/// A chart and its ordered dimensions, plus whether netdata has seen its
/// declaration yet.
///
/// Dimensions are only ever appended. Output always follows the order in
/// which they were added, never the iteration order of a snapshot.
///
/// `type` and `id` are written bare on CHART and BEGIN lines, so spaces and
/// quotes in them are dropped: `Chart::new("my type", "a b", ..)` is
/// rendered as `mytype.ab`.
#[derive(Debug, Clone)]
pub struct Chart {
    metadata: ChartMetadata,
    dimensions: Vec<DimensionMetadata>,
    /// Snapshot key each dimension reads, by position in `dimensions`
    sources: Vec<Source>,
    known: HashSet<String>,
    declared: bool,
    redeclare: bool,
    dynamic_dimensions: bool,
}

#[derive(Debug, Clone)]
enum Source {
    /// Added by the caller: the dimension id, or `<chart id>_<dimension id>`
    /// while dynamic dimensions are enabled
    Declared,
    /// Discovered from this snapshot key
    Series(String),
}

impl Chart {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chart_type: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        title: impl Into<String>,
        units: impl Into<String>,
        family: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self::from_metadata(ChartMetadata {
            chart_type: chart_type.into(),
            id: id.into(),
            name: name.into(),
            title: title.into(),
            units: units.into(),
            family: family.into(),
            category: category.into(),
        })
    }

    pub fn from_metadata(metadata: ChartMetadata) -> Self {
        Self {
            metadata,
            dimensions: Vec::new(),
            sources: Vec::new(),
            known: HashSet::new(),
            declared: false,
            redeclare: false,
            dynamic_dimensions: true,
        }
    }

    /// A chart with the given dimensions. When several share an id, the
    /// first one is kept.
    pub fn with_dimensions<I>(metadata: ChartMetadata, dimensions: I) -> Self
    where
        I: IntoIterator<Item = DimensionMetadata>,
    {
        let mut chart = Self::from_metadata(metadata);
        for dimension in dimensions {
            if chart.known.insert(dimension.id.clone()) {
                chart.dimensions.push(dimension);
                chart.sources.push(Source::Declared);
            }
        }
        chart
    }

    /// Append a dimension.
    ///
    /// This does not schedule a re-declaration. Callers adding dimensions to
    /// a chart that was already declared must call [`Chart::redeclare`].
    pub fn add_dimension(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        algorithm: DimensionAlgorithm,
    ) -> Result<(), ChartError> {
        let id = id.into();
        if self.known.contains(&id) {
            return Err(ChartError::DuplicateDimension {
                chart: self.metadata.full_id(),
                dimension: id,
            });
        }
        self.known.insert(id.clone());
        self.dimensions.push(DimensionMetadata::new(id, name, algorithm));
        self.sources.push(Source::Declared);
        Ok(())
    }

    /// Emit the full declaration again on the next update that writes values.
    pub fn redeclare(&mut self) {
        self.redeclare = true;
    }

    /// Enable or disable discovery of `<id>_<dimension>` snapshot keys.
    pub fn set_dynamic_dimensions(&mut self, enabled: bool) {
        self.dynamic_dimensions = enabled;
    }

    pub fn metadata(&self) -> &ChartMetadata {
        &self.metadata
    }

    pub fn dimensions(&self) -> &[DimensionMetadata] {
        &self.dimensions
    }

    pub fn has_dimension(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    pub fn is_declared(&self) -> bool {
        self.declared
    }

    /// Whether the next update that writes values will emit CHART + DIMENSION lines.
    pub fn needs_declaration(&self) -> bool {
        !self.declared || self.redeclare
    }

    pub fn key(&self) -> String {
        self.metadata.key()
    }

    /// Render an update for this chart from `snapshot`.
    ///
    /// A dimension added by the caller takes its value from the snapshot key
    /// equal to its id, or, while dynamic dimensions are enabled, from
    /// `<chart id>_<dimension id>`. Snapshot keys of the form
    /// `<chart id>_<suffix>` with an unknown suffix add an absolute
    /// dimension named `<suffix>` that only ever reads that key, and force a
    /// re-declaration. When several appear in one snapshot they are added in
    /// sorted order.
    ///
    /// Nothing is written and `false` is returned when no dimension has a
    /// value; a pending declaration then waits for the next update.
    pub fn update(
        &mut self,
        snapshot: &Snapshot,
        elapsed: Duration,
        writer: &mut ChartWriter,
    ) -> bool {
        let prefix = format!("{}_", self.metadata.id);

        if self.dynamic_dimensions {
            let discovered: BTreeSet<(&str, &str)> = snapshot
                .keys()
                .filter_map(|key| key.strip_prefix(prefix.as_str()).map(|suffix| (suffix, key.as_str())))
                .filter(|(suffix, _)| !suffix.is_empty() && !self.known.contains(*suffix))
                .collect();

            for (suffix, key) in discovered {
                self.known.insert(suffix.to_string());
                self.dimensions.push(DimensionMetadata::new(
                    suffix,
                    suffix,
                    DimensionAlgorithm::Absolute,
                ));
                self.sources.push(Source::Series(key.to_string()));
                self.redeclare = true;
                tracing::trace!(chart = %self.metadata.full_id(), dimension = suffix, "discovered dimension");
            }
        }

        let dynamic = self.dynamic_dimensions;
        let values: Vec<(&str, &str)> = self
            .dimensions
            .iter()
            .zip(&self.sources)
            .filter_map(|(dim, source)| {
                let value = match source {
                    Source::Series(key) => snapshot.get(key),
                    Source::Declared => snapshot.get(&dim.id).or_else(|| {
                        dynamic
                            .then(|| snapshot.get(&format!("{}{}", prefix, dim.id)))
                            .flatten()
                    }),
                };
                value.map(|value| (dim.id.as_str(), value.as_str()))
            })
            .collect();

        if values.is_empty() {
            return false;
        }

        if self.needs_declaration() {
            writer.write_chart_definition(&self.metadata, &self.dimensions);
            tracing::trace!(chart = %self.metadata.full_id(), dimensions = self.dimensions.len(), "declared chart");
        }

        writer.begin_chart(&self.metadata, elapsed);
        for (id, value) in values {
            writer.write_dimension(id, value);
        }
        writer.end_chart();

        self.declared = true;
        self.redeclare = false;
        true
    }
}
