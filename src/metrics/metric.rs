//! Metric handles.
//!
//! A metric is a thin, typed handle bound to one reporter. Recording never
//! buffers locally: each call becomes exactly one record in the reporter.

use crate::core::{Labels, Result};
use crate::metrics::types::{validate_buckets, MetricDescriptor, MetricType};
use crate::reporter::Reporter;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A metric bound to a reporter.
///
/// The handle borrows its reporter, so it cannot outlive it.
pub struct Metric<'r> {
    descriptor: Arc<MetricDescriptor>,
    common_labels: Labels,
    reporter: &'r dyn Reporter,
}

impl<'r> Metric<'r> {
    /// Create a metric of any kind.
    pub fn new(
        metric_type: MetricType,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        reporter: &'r dyn Reporter,
        common_labels: Labels,
    ) -> Self {
        let descriptor = MetricDescriptor {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            metric_type,
            buckets: Vec::new(),
        };
        Self::from_descriptor(descriptor, reporter, common_labels)
    }

    pub(crate) fn from_descriptor(
        descriptor: MetricDescriptor,
        reporter: &'r dyn Reporter,
        common_labels: Labels,
    ) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            common_labels,
            reporter,
        }
    }

    /// Record one observation.
    pub fn record(&self, value: f64, additional_labels: Option<&Labels>) {
        self.reporter.add_metric(self, value, additional_labels);
    }

    /// Metric name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Metric description
    pub fn description(&self) -> &str {
        &self.descriptor.description
    }

    /// Unit of measurement
    pub fn unit(&self) -> &str {
        &self.descriptor.unit
    }

    /// Instrument kind
    pub fn metric_type(&self) -> MetricType {
        self.descriptor.metric_type
    }

    /// Labels applied to every observation of this metric (read-only)
    pub fn labels(&self) -> &Labels {
        &self.common_labels
    }

    /// Shared descriptor carried by every record of this metric
    pub fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.descriptor
    }

    /// Reporter this metric records into
    pub fn reporter(&self) -> &'r dyn Reporter {
        self.reporter
    }
}

impl fmt::Debug for Metric<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("descriptor", &self.descriptor)
            .field("common_labels", &self.common_labels)
            .field("reporter", &self.reporter.reporter_type())
            .finish()
    }
}

/// Instantaneous value that can go up or down.
#[derive(Debug)]
pub struct GaugeMetric<'r>(Metric<'r>);

impl<'r> GaugeMetric<'r> {
    /// Create a gauge bound to `reporter`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        reporter: &'r dyn Reporter,
        common_labels: Labels,
    ) -> Self {
        Self(Metric::new(MetricType::Gauge, name, description, unit, reporter, common_labels))
    }
}

impl<'r> Deref for GaugeMetric<'r> {
    type Target = Metric<'r>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Cumulative total that only increases.
#[derive(Debug)]
pub struct CounterMetric<'r>(Metric<'r>);

impl<'r> CounterMetric<'r> {
    /// Create a counter bound to `reporter`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        reporter: &'r dyn Reporter,
        common_labels: Labels,
    ) -> Self {
        Self(Metric::new(MetricType::Counter, name, description, unit, reporter, common_labels))
    }
}

impl<'r> Deref for CounterMetric<'r> {
    type Target = Metric<'r>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Distribution of observations.
///
/// Two recording contracts are available:
/// - [`Metric::record`] takes one scalar per call and is exported as a
///   single-bucket data point;
/// - [`HistogramMetric::record_bucket_counts`] takes a complete set of bucket
///   counts aligned with the boundaries given at construction.
#[derive(Debug)]
pub struct HistogramMetric<'r>(Metric<'r>);

impl<'r> HistogramMetric<'r> {
    /// Create a histogram with explicit bucket boundaries.
    ///
    /// Boundaries must be finite and strictly increasing; pass an empty list
    /// when only scalar observations will be recorded.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        reporter: &'r dyn Reporter,
        buckets: Vec<f64>,
        common_labels: Labels,
    ) -> Result<Self> {
        let name = name.into();
        validate_buckets(&name, &buckets)?;

        let descriptor = MetricDescriptor {
            name,
            description: description.into(),
            unit: unit.into(),
            metric_type: MetricType::Histogram,
            buckets,
        };
        Ok(Self(Metric::from_descriptor(descriptor, reporter, common_labels)))
    }

    /// Bucket boundaries
    pub fn buckets(&self) -> &[f64] {
        &self.0.descriptor.buckets
    }

    /// Record a pre-bucketed observation.
    ///
    /// `counts` must hold one entry per bucket, i.e. `buckets().len() + 1`
    /// values. On mismatch nothing is recorded.
    pub fn record_bucket_counts(
        &self,
        counts: Vec<f64>,
        additional_labels: Option<&Labels>,
    ) -> Result<()> {
        self.0.descriptor.validate_bucket_counts(&counts)?;
        self.0.reporter.add_record(&self.0, counts, additional_labels);
        Ok(())
    }
}

impl<'r> Deref for HistogramMetric<'r> {
    type Target = Metric<'r>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TelemetryError, TestContext};
    use crate::labels;
    use crate::reporter::{mock::MockReporter, RecordValue};

    #[test]
    fn test_gauge_metric_basic_recording() {
        let reporter = MockReporter::new(TestContext::default());
        let metric = GaugeMetric::new(
            "test.metric.gauge",
            "Test gauge metric",
            "percent",
            &reporter,
            labels!(),
        );

        metric.record(75.5, None);

        let records = reporter.recorded();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric.name, "test.metric.gauge");
        assert_eq!(records[0].metric.metric_type, MetricType::Gauge);
        assert_eq!(records[0].metric.description, "Test gauge metric");
        assert_eq!(records[0].metric.unit, "percent");
        assert_eq!(records[0].value, RecordValue::Scalar(75.5));
    }

    #[test]
    fn test_counter_metric_records_every_call() {
        let reporter = MockReporter::new(TestContext::default());
        let metric = CounterMetric::new(
            "packets.transmitted",
            "Total packets transmitted",
            "packets",
            &reporter,
            labels!(),
        );

        metric.record(1000.0, None);
        metric.record(1500.0, None);
        metric.record(2100.0, None);

        let values: Vec<_> = reporter.recorded().into_iter().map(|r| r.value).collect();
        assert_eq!(
            values,
            vec![
                RecordValue::Scalar(1000.0),
                RecordValue::Scalar(1500.0),
                RecordValue::Scalar(2100.0)
            ]
        );
        assert_eq!(metric.metric_type(), MetricType::Counter);
    }

    #[test]
    fn test_histogram_scalar_recording() {
        let reporter = MockReporter::new(TestContext::default());
        let metric = HistogramMetric::new(
            "response.time",
            "API response time distribution",
            "milliseconds",
            &reporter,
            vec![],
            labels!(),
        )
        .unwrap();

        for time in [1.2, 3.4, 2.1, 5.6, 1.8] {
            metric.record(time, None);
        }

        let records = reporter.recorded();
        assert_eq!(records.len(), 5);
        assert!(records
            .iter()
            .all(|r| r.metric.metric_type == MetricType::Histogram));
    }

    #[test]
    fn test_histogram_bucket_mismatch_records_nothing() {
        let reporter = MockReporter::new(TestContext::default());
        let metric = HistogramMetric::new(
            "test.histogram",
            "Test histogram",
            "ms",
            &reporter,
            vec![0.5, 1.0, 2.0],
            labels!(),
        )
        .unwrap();

        let err = metric.record_bucket_counts(vec![1.23], None).unwrap_err();
        assert!(matches!(err, TelemetryError::BucketMismatch { .. }));
        assert_eq!(reporter.measurement_count(), 0);

        let err = metric
            .record_bucket_counts(vec![2.5, 5.0, 1.0, 0.0], None)
            .unwrap_err();
        assert!(matches!(err, TelemetryError::Config(_)));
        assert_eq!(reporter.measurement_count(), 0);

        metric
            .record_bucket_counts(vec![2.0, 5.0, 1.0, 0.0], None)
            .unwrap();
        assert_eq!(
            reporter.recorded()[0].value,
            RecordValue::Buckets(vec![2.0, 5.0, 1.0, 0.0])
        );
    }

    #[test]
    fn test_histogram_rejects_unsorted_boundaries() {
        let reporter = MockReporter::new(TestContext::default());
        let result = HistogramMetric::new("h", "", "ms", &reporter, vec![2.0, 1.0], labels!());
        assert!(result.is_err());
    }

    #[test]
    fn test_common_labels_are_read_only_view() {
        let reporter = MockReporter::new(TestContext::default());
        let metric = GaugeMetric::new(
            "port.tx.util",
            "Port TX utilization",
            "percent",
            &reporter,
            labels! { "device.id" => "dut-01" },
        );
        assert_eq!(metric.labels().get("device.id").map(String::as_str), Some("dut-01"));
    }
}
