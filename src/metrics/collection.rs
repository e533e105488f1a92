//! Named bundles of related metrics sharing one label set.

use crate::core::{Labels, Result, TelemetryError};
use crate::metrics::definition::MetricDefinition;
use crate::metrics::metric::Metric;
use crate::metrics::types::MetricType;
use crate::reporter::Reporter;
use std::collections::HashSet;

/// Metrics built from an ordered list of definitions.
///
/// Every metric gets the collection's labels as its common labels and is
/// reachable through its attribute name.
#[derive(Debug)]
pub struct MetricCollection<'r> {
    labels: Labels,
    metrics: Vec<(&'static str, Metric<'r>)>,
}

impl<'r> MetricCollection<'r> {
    /// Build gauge metrics for every definition.
    pub fn build(
        reporter: &'r dyn Reporter,
        labels: Labels,
        definitions: &[MetricDefinition],
    ) -> Result<Self> {
        Self::build_with_type(reporter, labels, definitions, MetricType::Gauge)
    }

    /// Build metrics of `metric_type` for every definition.
    ///
    /// Fails with [`TelemetryError::DuplicateDefinition`] when two definitions
    /// share an attribute name.
    pub fn build_with_type(
        reporter: &'r dyn Reporter,
        labels: Labels,
        definitions: &[MetricDefinition],
        metric_type: MetricType,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(definitions.len());
        let mut metrics = Vec::with_capacity(definitions.len());

        for definition in definitions {
            if !seen.insert(definition.attribute_name) {
                return Err(TelemetryError::DuplicateDefinition {
                    attribute: definition.attribute_name.to_string(),
                });
            }

            let metric = Metric::new(
                metric_type,
                definition.metric_name,
                definition.description,
                definition.unit,
                reporter,
                labels.clone(),
            );
            metrics.push((definition.attribute_name, metric));
        }

        Ok(Self { labels, metrics })
    }

    /// Metric registered under `attribute`
    pub fn get(&self, attribute: &str) -> Option<&Metric<'r>> {
        self.metrics
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, metric)| metric)
    }

    /// Labels shared by every metric of the collection
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Metrics in definition order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Metric<'r>)> {
        self.metrics.iter().map(|(name, metric)| (*name, metric))
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// True if the collection holds no metrics
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
