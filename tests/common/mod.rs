//! Common test utilities and fixtures.

#![allow(dead_code)]

use opentelemetry_proto::tonic::common::v1::{any_value::Value, KeyValue};
use opentelemetry_proto::tonic::metrics::v1::{number_data_point, NumberDataPoint, ResourceMetrics};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;
use test_telemetry::core::{DbConfig, Labels, Result, TestContext, TsConfig};
use test_telemetry::labels;
use test_telemetry::reporter::{DbReporter, MetricExporter, TsReporter};

/// Context of the canonical end-to-end scenario.
pub fn t1_context() -> TestContext {
    TestContext::from_labels(labels! { "test.testcase" => "t1" })
}

/// DB reporter writing into a fresh temporary directory.
pub fn db_reporter(context: TestContext) -> (TempDir, DbReporter) {
    let dir = TempDir::new().unwrap();
    let config = DbConfig {
        output_dir: Some(dir.path().to_path_buf()),
        ..DbConfig::default()
    };
    let reporter = DbReporter::new(&config, context).unwrap();
    (dir, reporter)
}

/// Exporter recording every batch it receives.
#[derive(Clone, Default)]
pub struct CapturingExporter {
    batches: Arc<Mutex<Vec<ResourceMetrics>>>,
}

impl CapturingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<ResourceMetrics> {
        self.batches.lock().clone()
    }

    pub fn export_count(&self) -> usize {
        self.batches.lock().len()
    }
}

impl MetricExporter for CapturingExporter {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn export(&self, resource_metrics: ResourceMetrics) -> Result<()> {
        self.batches.lock().push(resource_metrics);
        Ok(())
    }
}

/// TS reporter delivering to a capturing exporter.
pub fn ts_reporter(context: TestContext) -> (CapturingExporter, TsReporter) {
    let exporter = CapturingExporter::new();
    let reporter =
        TsReporter::with_exporter(&TsConfig::default(), context, Box::new(exporter.clone()));
    (exporter, reporter)
}

/// Attributes of a data point as labels.
pub fn attributes_to_labels(attributes: &[KeyValue]) -> Labels {
    attributes
        .iter()
        .map(|kv| {
            let value = match kv.value.as_ref().and_then(|v| v.value.as_ref()) {
                Some(Value::StringValue(s)) => s.clone(),
                other => panic!("unexpected attribute value {:?}", other),
            };
            (kv.key.clone(), value)
        })
        .collect()
}

/// Double value of a number data point.
pub fn point_value(point: &NumberDataPoint) -> f64 {
    match point.value {
        Some(number_data_point::Value::AsDouble(v)) => v,
        other => panic!("unexpected data point value {:?}", other),
    }
}
