//! Time-series reporter: encodes batches as OTLP metrics.
//!
//! Records are grouped by (metric name, metric type) in first-seen order;
//! every group becomes one OTLP metric with one data point per record. All
//! groups share a single resource (service identity, test context and
//! static resource attributes) and a single instrumentation scope.

use crate::core::config::ENDPOINT_ENV;
use crate::core::{Labels, Result, TelemetryError, TestContext, TsConfig};
use crate::metrics::{MetricDescriptor, MetricType};
use crate::reporter::exporter::{LogExporter, MetricExporter, MockExportFn, OtlpGrpcExporter};
use crate::reporter::{Batch, MetricRecord, RecordValue, Reporter, ReporterCore, ReporterType};
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::metrics::v1::{
    metric::Data, number_data_point, AggregationTemporality, Gauge, Histogram, HistogramDataPoint,
    Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use parking_lot::RwLock;
use prost::Message;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Instrumentation scope name on every exported batch
pub const SCOPE_NAME: &str = "test-telemetry";
/// Instrumentation scope version on every exported batch
pub const SCOPE_VERSION: &str = "1.0.0";

/// Reporter exporting batches to an OTLP collector.
pub struct TsReporter {
    core: ReporterCore,
    config: TsConfig,
    endpoint: Option<String>,
    exporter: Box<dyn MetricExporter>,
    mock_exporter: RwLock<Option<MockExportFn>>,
}

impl TsReporter {
    /// Create a reporter, resolving the endpoint from `config` or the
    /// `OTEL_EXPORTER_OTLP_ENDPOINT` environment variable.
    ///
    /// Without an endpoint the reporter runs in log-only mode.
    pub fn new(config: &TsConfig, test_context: TestContext) -> Result<Self> {
        Self::with_env_lookup(config, test_context, |name| std::env::var(name).ok())
    }

    /// Create a reporter using `lookup` in place of the process environment.
    pub fn with_env_lookup<F>(config: &TsConfig, test_context: TestContext, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = config
            .endpoint
            .clone()
            .or_else(|| lookup(ENDPOINT_ENV).filter(|value| !value.is_empty()));

        let exporter: Box<dyn MetricExporter> = match &endpoint {
            Some(endpoint) => {
                match OtlpGrpcExporter::new(endpoint, &config.headers, config.export_timeout) {
                    Ok(exporter) => Box::new(exporter),
                    Err(e @ TelemetryError::Config(_)) => return Err(e),
                    Err(e) => {
                        warn!(
                            "Failed to create OTLP exporter for {}, falling back to log-only mode: {}",
                            endpoint, e
                        );
                        Box::new(LogExporter::new())
                    }
                }
            }
            None => {
                info!("No OTLP endpoint configured, ts reporter running in log-only mode");
                Box::new(LogExporter::new())
            }
        };

        let mut reporter = Self::with_exporter(config, test_context, exporter);
        reporter.endpoint = endpoint;
        Ok(reporter)
    }

    /// Create a reporter delivering batches to `exporter`.
    pub fn with_exporter(
        config: &TsConfig,
        test_context: TestContext,
        exporter: Box<dyn MetricExporter>,
    ) -> Self {
        info!(
            "Created ts reporter with {} exporter ({} context labels)",
            exporter.name(),
            test_context.len()
        );
        Self {
            core: ReporterCore::new(ReporterType::Ts, test_context),
            config: config.clone(),
            endpoint: config.endpoint.clone(),
            exporter,
            mock_exporter: RwLock::new(None),
        }
    }

    /// Route batches to `callback` instead of the exporter; `None` restores
    /// the exporter.
    pub fn set_mock_exporter(&self, callback: Option<MockExportFn>) {
        *self.mock_exporter.write() = callback;
    }

    /// True when a mock callback is installed
    pub fn has_mock_exporter(&self) -> bool {
        self.mock_exporter.read().is_some()
    }

    /// Resolved collector endpoint, if any
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Name of the active exporter (`otlp-grpc` or `log`)
    pub fn exporter_name(&self) -> &'static str {
        self.exporter.name()
    }

    /// Encode `batch` as one OTLP `ResourceMetrics`.
    ///
    /// Returns `None` for an empty batch.
    pub fn build_resource_metrics(&self, batch: &Batch) -> Result<Option<ResourceMetrics>> {
        if batch.is_empty() {
            return Ok(None);
        }

        let mut groups: Vec<(&MetricDescriptor, Vec<&MetricRecord>)> = Vec::new();
        let mut index: HashMap<(&str, MetricType), usize> = HashMap::new();

        for record in &batch.records {
            let key = (record.metric.name.as_str(), record.metric.metric_type);
            match index.get(&key) {
                Some(&i) => groups[i].1.push(record),
                None => {
                    index.insert(key, groups.len());
                    groups.push((record.metric.as_ref(), vec![record]));
                }
            }
        }

        let metrics = groups
            .into_iter()
            .map(|(descriptor, records)| encode_metric(descriptor, &records, batch.timestamp_ns))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ResourceMetrics {
            resource: Some(self.resource()),
            scope_metrics: vec![ScopeMetrics {
                scope: Some(InstrumentationScope {
                    name: SCOPE_NAME.to_string(),
                    version: SCOPE_VERSION.to_string(),
                    ..Default::default()
                }),
                metrics,
                ..Default::default()
            }],
            ..Default::default()
        }))
    }

    fn resource(&self) -> Resource {
        let mut attributes = Labels::new();
        attributes.insert(SERVICE_NAME.to_string(), self.config.service_name.clone());
        attributes.insert(SERVICE_VERSION.to_string(), self.config.service_version.clone());
        for (key, value) in self.core.test_context().labels() {
            attributes.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.config.resource_attributes {
            attributes.insert(key.clone(), value.clone());
        }

        Resource {
            attributes: to_attributes(&attributes),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for TsReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsReporter")
            .field("endpoint", &self.endpoint)
            .field("exporter", &self.exporter.name())
            .field("has_mock_exporter", &self.has_mock_exporter())
            .field("pending", &self.core.len())
            .finish()
    }
}

impl Reporter for TsReporter {
    fn core(&self) -> &ReporterCore {
        &self.core
    }

    fn flush(&self, batch: &Batch) -> Result<()> {
        let Some(resource_metrics) = self.build_resource_metrics(batch)? else {
            return Ok(());
        };

        debug!(
            "Encoded {} measurements into {} bytes of OTLP",
            batch.len(),
            resource_metrics.encoded_len()
        );

        let mock = self.mock_exporter.read().clone();
        if let Some(mock) = mock {
            (*mock)(&resource_metrics);
            return Ok(());
        }

        match self.exporter.export(resource_metrics) {
            Ok(()) => debug!(
                "Exported {} measurements via {}",
                batch.len(),
                self.exporter.name()
            ),
            Err(e) => warn!(
                category = e.category(),
                "Dropping {} measurements, export via {} failed: {}",
                batch.len(),
                self.exporter.name(),
                e
            ),
        }
        Ok(())
    }
}

/// One OTLP metric for a (name, type) group. Every point carries the batch
/// timestamp as both start and observation time.
fn encode_metric(
    descriptor: &MetricDescriptor,
    records: &[&MetricRecord],
    timestamp_ns: u64,
) -> Result<Metric> {
    let data = match descriptor.metric_type {
        MetricType::Gauge => Data::Gauge(Gauge {
            data_points: records
                .iter()
                .map(|r| number_point(r, timestamp_ns))
                .collect::<Result<_>>()?,
        }),
        MetricType::Counter => Data::Sum(Sum {
            data_points: records
                .iter()
                .map(|r| number_point(r, timestamp_ns))
                .collect::<Result<_>>()?,
            aggregation_temporality: AggregationTemporality::Cumulative as i32,
            is_monotonic: true,
        }),
        MetricType::Histogram => Data::Histogram(Histogram {
            data_points: records
                .iter()
                .map(|r| histogram_point(r, timestamp_ns))
                .collect::<Result<_>>()?,
            aggregation_temporality: AggregationTemporality::Cumulative as i32,
        }),
    };

    Ok(Metric {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        unit: descriptor.unit.clone(),
        data: Some(data),
        ..Default::default()
    })
}

fn number_point(record: &MetricRecord, timestamp_ns: u64) -> Result<NumberDataPoint> {
    let value = match &record.value {
        RecordValue::Scalar(v) => *v,
        RecordValue::Buckets(_) => {
            return Err(TelemetryError::config(format!(
                "Metric '{}' is a {} and cannot carry bucket counts",
                record.metric.name, record.metric.metric_type
            )))
        }
    };

    Ok(NumberDataPoint {
        attributes: to_attributes(&record.labels),
        start_time_unix_nano: timestamp_ns,
        time_unix_nano: timestamp_ns,
        value: Some(number_data_point::Value::AsDouble(value)),
        ..Default::default()
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn histogram_point(record: &MetricRecord, timestamp_ns: u64) -> Result<HistogramDataPoint> {
    let point = HistogramDataPoint {
        attributes: to_attributes(&record.labels),
        start_time_unix_nano: timestamp_ns,
        time_unix_nano: timestamp_ns,
        ..Default::default()
    };

    match &record.value {
        // Single observation: one bucket holding it
        RecordValue::Scalar(v) => Ok(HistogramDataPoint {
            count: 1,
            sum: Some(*v),
            bucket_counts: vec![1],
            explicit_bounds: Vec::new(),
            ..point
        }),
        RecordValue::Buckets(counts) => {
            record.metric.validate_bucket_counts(counts)?;
            // Validated as non-negative whole numbers
            let bucket_counts: Vec<u64> = counts.iter().map(|c| *c as u64).collect();
            Ok(HistogramDataPoint {
                count: bucket_counts.iter().sum(),
                sum: None,
                bucket_counts,
                explicit_bounds: record.metric.buckets.clone(),
                ..point
            })
        }
    }
}

fn to_attributes(labels: &Labels) -> Vec<KeyValue> {
    labels
        .iter()
        .map(|(key, value)| KeyValue {
            key: key.clone(),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(value.clone())),
            }),
        })
        .collect()
}
