//! Reporters: measurement buffering, label merging and batch flushing.
//!
//! A reporter owns a buffer of [`MetricRecord`]s and the immutable test
//! context of the run. Metrics push records into it; `report()` drains the
//! buffer into one [`Batch`] stamped with a single timestamp and hands it to
//! the backend:
//!
//! - [`ts::TsReporter`] encodes the batch as OTLP and exports it
//! - [`db::DbReporter`] persists the batch as one JSON file
//! - [`mock::MockReporter`] keeps batches in memory for tests

pub mod db;
pub mod exporter;
pub mod mock;
pub mod ts;

pub use db::DbReporter;
pub use exporter::{LogExporter, MetricExporter, MockExportFn, OtlpGrpcExporter};
pub use mock::MockReporter;
pub use ts::TsReporter;

use crate::core::time::{nanos_to_datetime, now_nanos};
use crate::core::{merge_labels, Labels, Result, TestContext};
use crate::metrics::{Metric, MetricDescriptor};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend kind of a reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReporterType {
    /// Real-time OTLP export
    Ts,
    /// Per-flush JSON files
    Db,
    /// In-memory, for tests
    Mock,
}

impl ReporterType {
    /// Lowercase identifier written to persisted files
    pub fn as_str(&self) -> &'static str {
        match self {
            ReporterType::Ts => "ts",
            ReporterType::Db => "db",
            ReporterType::Mock => "mock",
        }
    }
}

impl fmt::Display for ReporterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of one measurement.
///
/// Serializes as a bare number or an array of counts. JSON has no literal
/// for non-finite doubles, so a NaN or infinite scalar is written as the
/// string `"NaN"`, `"inf"` or `"-inf"` and read back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireValue", try_from = "WireValue")]
pub enum RecordValue {
    /// One observation
    Scalar(f64),
    /// Pre-bucketed histogram counts, one per bucket
    Buckets(Vec<f64>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireValue {
    Number(f64),
    NonFinite(String),
    Buckets(Vec<f64>),
}

impl From<RecordValue> for WireValue {
    fn from(value: RecordValue) -> Self {
        match value {
            RecordValue::Scalar(v) if v.is_nan() => WireValue::NonFinite("NaN".to_string()),
            RecordValue::Scalar(v) if v.is_infinite() => {
                let text = if v > 0.0 { "inf" } else { "-inf" };
                WireValue::NonFinite(text.to_string())
            }
            RecordValue::Scalar(v) => WireValue::Number(v),
            RecordValue::Buckets(counts) => WireValue::Buckets(counts),
        }
    }
}

impl TryFrom<WireValue> for RecordValue {
    type Error = String;

    fn try_from(value: WireValue) -> std::result::Result<Self, Self::Error> {
        match value {
            WireValue::Number(v) => Ok(RecordValue::Scalar(v)),
            WireValue::NonFinite(text) => match text.as_str() {
                "NaN" => Ok(RecordValue::Scalar(f64::NAN)),
                "inf" => Ok(RecordValue::Scalar(f64::INFINITY)),
                "-inf" => Ok(RecordValue::Scalar(f64::NEG_INFINITY)),
                other => Err(format!("invalid measurement value '{}'", other)),
            },
            WireValue::Buckets(counts) => Ok(RecordValue::Buckets(counts)),
        }
    }
}

/// One buffered measurement with its fully merged labels.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Metric the measurement belongs to
    pub metric: Arc<MetricDescriptor>,
    /// Observed value
    pub value: RecordValue,
    /// Context, common and additional labels merged
    pub labels: Labels,
}

/// Records drained by one `report()` call.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Shared timestamp of every record, nanoseconds since Unix epoch
    pub timestamp_ns: u64,
    /// Records in insertion order
    pub records: Vec<MetricRecord>,
}

impl Batch {
    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Batch timestamp as a UTC datetime
    pub fn datetime(&self) -> DateTime<Utc> {
        nanos_to_datetime(self.timestamp_ns)
    }
}

/// State shared by every reporter backend.
///
/// Appends and drains go through one mutex, so records added while a flush
/// is running land in the next batch.
#[derive(Debug)]
pub struct ReporterCore {
    reporter_type: ReporterType,
    test_context: TestContext,
    buffer: Mutex<Vec<MetricRecord>>,
}

impl ReporterCore {
    /// Create an empty core.
    pub fn new(reporter_type: ReporterType, test_context: TestContext) -> Self {
        Self {
            reporter_type,
            test_context,
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Backend kind
    pub fn reporter_type(&self) -> ReporterType {
        self.reporter_type
    }

    /// Immutable context labels
    pub fn test_context(&self) -> &TestContext {
        &self.test_context
    }

    /// Merge labels and append one record.
    pub fn push(&self, metric: &Metric<'_>, value: RecordValue, additional_labels: Option<&Labels>) {
        let labels = merge_labels(self.test_context.labels(), metric.labels(), additional_labels);
        let record = MetricRecord {
            metric: Arc::clone(metric.descriptor()),
            value,
            labels,
        };
        self.buffer.lock().push(record);
    }

    /// Take every buffered record, leaving the buffer empty.
    pub fn drain(&self) -> Vec<MetricRecord> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Copy of the buffered records
    pub fn snapshot(&self) -> Vec<MetricRecord> {
        self.buffer.lock().clone()
    }
}

/// A telemetry backend.
///
/// Implementors provide the shared [`ReporterCore`] and a `flush` hook;
/// buffering, label merging and the `report()` protocol are provided.
pub trait Reporter: Send + Sync {
    /// Shared buffer and context
    fn core(&self) -> &ReporterCore;

    /// Deliver one non-empty batch.
    ///
    /// Called by [`Reporter::report`] after the buffer has been drained.
    fn flush(&self, batch: &Batch) -> Result<()>;

    /// Backend kind
    fn reporter_type(&self) -> ReporterType {
        self.core().reporter_type()
    }

    /// Context labels attached to every record
    fn test_context(&self) -> &TestContext {
        self.core().test_context()
    }

    /// Buffer one scalar observation of `metric`.
    fn add_metric(&self, metric: &Metric<'_>, value: f64, additional_labels: Option<&Labels>) {
        self.core()
            .push(metric, RecordValue::Scalar(value), additional_labels);
    }

    /// Buffer one pre-bucketed histogram observation of `metric`.
    ///
    /// Counts are validated by the histogram before they get here.
    fn add_record(&self, metric: &Metric<'_>, counts: Vec<f64>, additional_labels: Option<&Labels>) {
        self.core()
            .push(metric, RecordValue::Buckets(counts), additional_labels);
    }

    /// Number of buffered, not yet reported measurements
    fn measurement_count(&self) -> usize {
        self.core().len()
    }

    /// Flush all buffered measurements as one batch.
    ///
    /// Returns the number of measurements in the batch, 0 when the buffer
    /// was empty (no I/O happens then). The buffer is cleared before the
    /// backend runs, so a failed flush loses its batch.
    fn report(&self) -> Result<usize> {
        let records = self.core().drain();
        if records.is_empty() {
            debug!("{} reporter: nothing to report", self.reporter_type());
            return Ok(0);
        }

        let batch = Batch {
            timestamp_ns: now_nanos(),
            records,
        };
        self.flush(&batch)?;
        Ok(batch.len())
    }
}

/// Reports pending measurements when dropped.
///
/// Metrics may borrow the reporter through the guard. Flush errors at drop
/// are logged, not raised; call [`Reporter::report`] explicitly where the
/// outcome matters.
pub struct FlushGuard<'r, R: Reporter + ?Sized> {
    reporter: &'r R,
}

impl<'r, R: Reporter + ?Sized> FlushGuard<'r, R> {
    /// Guard `reporter` until the end of the scope.
    pub fn new(reporter: &'r R) -> Self {
        Self { reporter }
    }
}

impl<R: Reporter + ?Sized> Deref for FlushGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        self.reporter
    }
}

impl<R: Reporter + ?Sized> Drop for FlushGuard<'_, R> {
    fn drop(&mut self) {
        if self.reporter.measurement_count() == 0 {
            return;
        }
        match self.reporter.report() {
            Ok(count) => debug!(
                "{} reporter: flushed {} pending measurements at scope end",
                self.reporter.reporter_type(),
                count
            ),
            Err(e) => warn!(
                category = e.category(),
                "{} reporter: failed to flush at scope end: {}",
                self.reporter.reporter_type(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TelemetryError;
    use crate::labels;
    use crate::metrics::{GaugeMetric, HistogramMetric};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend whose flush always fails.
    struct FailingReporter {
        core: ReporterCore,
        flushes: AtomicUsize,
    }

    impl Reporter for FailingReporter {
        fn core(&self) -> &ReporterCore {
            &self.core
        }

        fn flush(&self, _batch: &Batch) -> Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Err(TelemetryError::persistence(
                "/nonexistent/telemetry.json",
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ))
        }
    }

    #[test]
    fn test_empty_report_does_not_flush() {
        let reporter = MockReporter::new(TestContext::default());
        assert_eq!(reporter.report().unwrap(), 0);
        assert_eq!(reporter.report_count(), 0);
    }

    #[test]
    fn test_report_shares_one_timestamp() {
        let reporter = MockReporter::new(TestContext::default());
        let metric = GaugeMetric::new("port.rx.util", "", "percent", &reporter, labels!());

        metric.record(1.0, None);
        metric.record(2.0, None);
        assert_eq!(reporter.measurement_count(), 2);
        assert_eq!(reporter.report().unwrap(), 2);
        assert_eq!(reporter.measurement_count(), 0);

        let batches = reporter.reported_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0].timestamp_ns > 0);
    }

    #[test]
    fn test_buffer_cleared_when_flush_fails() {
        let reporter = FailingReporter {
            core: ReporterCore::new(ReporterType::Db, TestContext::default()),
            flushes: AtomicUsize::new(0),
        };
        let metric = GaugeMetric::new("psu.power", "", "W", &reporter, labels!());
        metric.record(220.0, None);

        let err = reporter.report().unwrap_err();
        assert!(err.is_fatal_to_report());
        assert_eq!(reporter.measurement_count(), 0);
        assert_eq!(reporter.flushes.load(Ordering::SeqCst), 1);

        // Nothing left to flush
        assert_eq!(reporter.report().unwrap(), 0);
        assert_eq!(reporter.flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_records_share_descriptor() {
        let reporter = MockReporter::new(TestContext::default());
        let metric = GaugeMetric::new("fan.speed", "", "rpm", &reporter, labels!());
        metric.record(1.0, None);
        metric.record(2.0, None);

        let records = reporter.recorded();
        assert!(Arc::ptr_eq(&records[0].metric, &records[1].metric));
    }

    #[test]
    fn test_labels_merged_at_record_time() {
        let context = TestContext::from_labels(labels! { "test.testcase" => "t1", "device.id" => "ctx" });
        let reporter = MockReporter::new(context);
        let metric = GaugeMetric::new(
            "port.tx.util",
            "",
            "percent",
            &reporter,
            labels! { "device.id" => "dut-01" },
        );

        metric.record(75.5, Some(&labels! { "iter" => 1 }));

        let records = reporter.recorded();
        assert_eq!(
            records[0].labels,
            labels! { "test.testcase" => "t1", "device.id" => "dut-01", "iter" => "1" }
        );
    }

    #[test]
    fn test_flush_guard_reports_pending_measurements() {
        let reporter = MockReporter::new(TestContext::default());
        {
            let guard = FlushGuard::new(&reporter);
            let metric = GaugeMetric::new("queue.watermark.bytes", "", "bytes", &*guard, labels!());
            metric.record(4096.0, None);
        }
        assert_eq!(reporter.report_count(), 1);
        assert_eq!(reporter.measurement_count(), 0);

        // Nothing pending, nothing reported
        drop(FlushGuard::new(&reporter));
        assert_eq!(reporter.report_count(), 1);
    }

    #[test]
    fn test_bucket_record_value() {
        let reporter = MockReporter::new(TestContext::default());
        let metric =
            HistogramMetric::new("h", "", "ms", &reporter, vec![1.0], labels!()).unwrap();
        metric.record_bucket_counts(vec![3.0, 4.0], None).unwrap();
        assert_eq!(reporter.recorded()[0].value, RecordValue::Buckets(vec![3.0, 4.0]));
    }

    #[test]
    fn test_record_value_json_shape() {
        assert_eq!(serde_json::to_string(&RecordValue::Scalar(75.5)).unwrap(), "75.5");
        assert_eq!(
            serde_json::to_string(&RecordValue::Buckets(vec![1.0, 2.0])).unwrap(),
            "[1.0,2.0]"
        );
        assert_eq!(serde_json::to_string(&ReporterType::Db).unwrap(), "\"db\"");
    }

    #[test]
    fn test_non_finite_values_survive_json() {
        let json = serde_json::to_string(&vec![
            RecordValue::Scalar(f64::NAN),
            RecordValue::Scalar(f64::INFINITY),
            RecordValue::Scalar(f64::NEG_INFINITY),
        ])
        .unwrap();
        assert_eq!(json, r#"["NaN","inf","-inf"]"#);

        let values: Vec<RecordValue> = serde_json::from_str(&json).unwrap();
        assert!(matches!(values[0], RecordValue::Scalar(v) if v.is_nan()));
        assert_eq!(values[1], RecordValue::Scalar(f64::INFINITY));
        assert_eq!(values[2], RecordValue::Scalar(f64::NEG_INFINITY));

        assert!(serde_json::from_str::<RecordValue>("\"fast\"").is_err());
    }
}
