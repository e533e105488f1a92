//! Delivery of encoded OTLP batches.
//!
//! The TS reporter encodes a batch once and hands the resulting
//! `ResourceMetrics` to a [`MetricExporter`]. Two exporters exist: a gRPC
//! client for a real collector and a log-only fallback used when no endpoint
//! is configured.

use crate::core::{Result, TelemetryError};
use opentelemetry_proto::tonic::collector::metrics::v1::{
    metrics_service_client::MetricsServiceClient, ExportMetricsServiceRequest,
};
use opentelemetry_proto::tonic::common::v1::{any_value::Value, KeyValue};
use opentelemetry_proto::tonic::metrics::v1::{metric::Data, number_data_point, ResourceMetrics};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

/// Callback receiving every encoded batch in place of the real exporter.
pub type MockExportFn = Arc<dyn Fn(&ResourceMetrics) + Send + Sync>;

/// Destination of encoded batches.
pub trait MetricExporter: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Deliver one batch.
    fn export(&self, resource_metrics: ResourceMetrics) -> Result<()>;
}

/// Exporter that writes every data point to the log.
///
/// Used when no collector endpoint is configured so a test run never
/// depends on collector availability.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExporter;

impl LogExporter {
    /// Create a log-only exporter.
    pub fn new() -> Self {
        Self
    }
}

impl MetricExporter for LogExporter {
    fn name(&self) -> &'static str {
        "log"
    }

    fn export(&self, resource_metrics: ResourceMetrics) -> Result<()> {
        for scope in &resource_metrics.scope_metrics {
            for metric in &scope.metrics {
                match &metric.data {
                    Some(Data::Gauge(gauge)) => {
                        for point in &gauge.data_points {
                            info!(
                                metric = %metric.name,
                                kind = "gauge",
                                value = number_value(&point.value),
                                labels = %format_attributes(&point.attributes),
                                "telemetry data point"
                            );
                        }
                    }
                    Some(Data::Sum(sum)) => {
                        for point in &sum.data_points {
                            info!(
                                metric = %metric.name,
                                kind = "counter",
                                value = number_value(&point.value),
                                labels = %format_attributes(&point.attributes),
                                "telemetry data point"
                            );
                        }
                    }
                    Some(Data::Histogram(histogram)) => {
                        for point in &histogram.data_points {
                            info!(
                                metric = %metric.name,
                                kind = "histogram",
                                count = point.count,
                                sum = point.sum.unwrap_or_default(),
                                labels = %format_attributes(&point.attributes),
                                "telemetry data point"
                            );
                        }
                    }
                    _ => debug!("Skipping metric {} with unsupported data", metric.name),
                }
            }
        }
        Ok(())
    }
}

fn number_value(value: &Option<number_data_point::Value>) -> f64 {
    match value {
        Some(number_data_point::Value::AsDouble(v)) => *v,
        #[allow(clippy::cast_precision_loss)]
        Some(number_data_point::Value::AsInt(v)) => *v as f64,
        None => f64::NAN,
    }
}

fn format_attributes(attributes: &[KeyValue]) -> String {
    attributes
        .iter()
        .map(|kv| {
            let value = match kv.value.as_ref().and_then(|v| v.value.as_ref()) {
                Some(Value::StringValue(s)) => s.clone(),
                Some(Value::IntValue(i)) => i.to_string(),
                Some(Value::DoubleValue(d)) => d.to_string(),
                Some(Value::BoolValue(b)) => b.to_string(),
                _ => String::new(),
            };
            format!("{}={}", kv.key, value)
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// OTLP/gRPC exporter with a blocking interface.
///
/// Owns a current-thread runtime that drives the tonic client. Exports run
/// on the calling thread, or on a short-lived helper thread when the caller
/// is itself inside a tokio runtime.
pub struct OtlpGrpcExporter {
    runtime: Option<Runtime>,
    client: Mutex<MetricsServiceClient<Channel>>,
    metadata: MetadataMap,
    endpoint: String,
    timeout: Duration,
}

impl OtlpGrpcExporter {
    /// Create an exporter for `endpoint`.
    ///
    /// The connection is established lazily on first export; an
    /// unreachable collector only shows up as an export failure.
    pub fn new(
        endpoint: &str,
        headers: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let metadata = build_metadata(headers)?;

        let channel_endpoint = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| TelemetryError::config(format!("Invalid OTLP endpoint '{}': {}", endpoint, e)))?
            .connect_timeout(timeout)
            .timeout(timeout);

        let runtime = Builder::new_current_thread().enable_all().build()?;

        let channel = {
            let _guard = runtime.enter();
            channel_endpoint.connect_lazy()
        };

        debug!("Created OTLP gRPC exporter for {}", endpoint);

        Ok(Self {
            runtime: Some(runtime),
            client: Mutex::new(MetricsServiceClient::new(channel)),
            metadata,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    /// Collector endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn block_on<F: Future + Send>(&self, future: F) -> Result<F::Output>
    where
        F::Output: Send,
    {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| TelemetryError::export("OTLP exporter runtime is shut down"))?;

        // A runtime cannot be driven from a thread that already runs one
        if Handle::try_current().is_err() {
            return Ok(runtime.block_on(future));
        }

        std::thread::scope(|scope| {
            scope
                .spawn(|| runtime.block_on(future))
                .join()
                .map_err(|_| TelemetryError::export("OTLP export thread panicked"))
        })
    }
}

impl Drop for OtlpGrpcExporter {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for OtlpGrpcExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtlpGrpcExporter")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MetricExporter for OtlpGrpcExporter {
    fn name(&self) -> &'static str {
        "otlp-grpc"
    }

    fn export(&self, resource_metrics: ResourceMetrics) -> Result<()> {
        let mut request = tonic::Request::new(ExportMetricsServiceRequest {
            resource_metrics: vec![resource_metrics],
        });
        *request.metadata_mut() = self.metadata.clone();

        let mut client = self.client.lock().clone();
        let timeout = self.timeout;

        let response = self
            .block_on(async move { tokio::time::timeout(timeout, client.export(request)).await })?
            .map_err(|_| TelemetryError::ExportTimeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        if let Some(partial) = response.into_inner().partial_success {
            if partial.rejected_data_points > 0 {
                warn!(
                    "Collector {} rejected {} data points: {}",
                    self.endpoint, partial.rejected_data_points, partial.error_message
                );
            }
        }

        Ok(())
    }
}

fn build_metadata(headers: &BTreeMap<String, String>) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::new();
    for (name, value) in headers {
        let key = MetadataKey::from_bytes(name.as_bytes())
            .map_err(|e| TelemetryError::config(format!("Invalid header name '{}': {}", name, e)))?;
        let value = MetadataValue::try_from(value.as_str())
            .map_err(|e| TelemetryError::config(format!("Invalid header value for '{}': {}", name, e)))?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::AnyValue;
    use opentelemetry_proto::tonic::metrics::v1::{Gauge, Metric, NumberDataPoint, ScopeMetrics};

    #[test]
    fn test_metadata_from_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("x-api-key".to_string(), "secret".to_string());

        let metadata = build_metadata(&headers).unwrap();
        assert_eq!(metadata.get("x-api-key").unwrap(), "secret");
    }

    #[test]
    fn test_invalid_header_value_rejected() {
        let mut headers = BTreeMap::new();
        headers.insert("x-api-key".to_string(), "bad\nvalue".to_string());

        let err = build_metadata(&headers).unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = OtlpGrpcExporter::new("not a uri", &BTreeMap::new(), Duration::from_secs(1));
        assert!(matches!(result, Err(TelemetryError::Config(_))));
    }

    #[test]
    fn test_exporter_connects_lazily() {
        let exporter =
            OtlpGrpcExporter::new("http://127.0.0.1:4317", &BTreeMap::new(), Duration::from_secs(1))
                .unwrap();
        assert_eq!(exporter.endpoint(), "http://127.0.0.1:4317");
        assert_eq!(exporter.name(), "otlp-grpc");
    }

    #[test]
    fn test_export_inside_async_context_fails_cleanly() {
        let outer = Builder::new_current_thread().enable_all().build().unwrap();
        let result = outer.block_on(async {
            let exporter =
                OtlpGrpcExporter::new("http://127.0.0.1:9", &BTreeMap::new(), Duration::from_millis(500))
                    .unwrap();
            exporter.export(ResourceMetrics::default())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_log_exporter_accepts_batches() {
        let point = NumberDataPoint {
            attributes: vec![KeyValue {
                key: "device.id".to_string(),
                value: Some(AnyValue {
                    value: Some(Value::StringValue("dut-01".to_string())),
                }),
            }],
            time_unix_nano: 1,
            value: Some(number_data_point::Value::AsDouble(42.0)),
            ..Default::default()
        };
        let batch = ResourceMetrics {
            scope_metrics: vec![ScopeMetrics {
                metrics: vec![Metric {
                    name: "fan.speed".to_string(),
                    data: Some(Data::Gauge(Gauge {
                        data_points: vec![point.clone()],
                    })),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(LogExporter::new().export(batch).is_ok());
        assert_eq!(format_attributes(&point.attributes), "device.id=dut-01");
        assert_eq!(number_value(&point.value), 42.0);
    }
}
