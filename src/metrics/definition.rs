use std::fmt;

/// Declarative description of one metric in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    /// Name under which the collection exposes the metric
    pub attribute_name: &'static str,
    /// Metric name in OpenTelemetry form (`port.rx.bps`)
    pub metric_name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Unit of measurement
    pub unit: &'static str,
}

impl MetricDefinition {
    /// Create a definition.
    pub const fn new(
        attribute_name: &'static str,
        metric_name: &'static str,
        description: &'static str,
        unit: &'static str,
    ) -> Self {
        Self {
            attribute_name,
            metric_name,
            description,
            unit,
        }
    }
}

impl fmt::Display for MetricDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetricDefinition({}: {})", self.attribute_name, self.metric_name)
    }
}
