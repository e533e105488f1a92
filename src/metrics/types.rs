//! Metric kinds and the metadata every measurement carries.

use crate::core::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OpenTelemetry instrument kinds supported by the reporters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Point-in-time measurement (utilization, temperature)
    Gauge,
    /// Monotonically increasing total (packets, errors)
    Counter,
    /// Distribution of observations (latencies, sizes)
    Histogram,
}

impl MetricType {
    /// Lowercase identifier used in persisted files
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and metadata of a metric, shared by all of its records
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    /// Metric name (dot separated, lowercase)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Unit of measurement
    pub unit: String,
    /// Instrument kind
    pub metric_type: MetricType,
    /// Histogram bucket boundaries; empty for other kinds
    pub buckets: Vec<f64>,
}

impl MetricDescriptor {
    /// Number of bucket counts a pre-bucketed histogram record must carry
    pub fn expected_bucket_counts(&self) -> usize {
        self.buckets.len() + 1
    }

    /// Check a pre-bucketed observation against this descriptor.
    pub fn validate_bucket_counts(&self, counts: &[f64]) -> Result<()> {
        if self.metric_type != MetricType::Histogram {
            return Err(TelemetryError::config(format!(
                "Metric '{}' is a {}, bucket counts are only valid for histograms",
                self.name, self.metric_type
            )));
        }

        if counts.len() != self.expected_bucket_counts() {
            return Err(TelemetryError::BucketMismatch {
                metric: self.name.clone(),
                expected: self.expected_bucket_counts(),
                actual: counts.len(),
            });
        }

        if let Some(bad) = counts
            .iter()
            .find(|c| !c.is_finite() || **c < 0.0 || c.fract() != 0.0)
        {
            return Err(TelemetryError::config(format!(
                "Histogram '{}' bucket counts must be non-negative whole numbers, got {}",
                self.name, bad
            )));
        }

        Ok(())
    }
}

/// Validate histogram bucket boundaries: finite and strictly increasing.
pub fn validate_buckets(name: &str, buckets: &[f64]) -> Result<()> {
    if buckets.iter().any(|b| !b.is_finite()) {
        return Err(TelemetryError::config(format!(
            "Histogram '{}' bucket boundaries must be finite",
            name
        )));
    }
    if buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(TelemetryError::config(format!(
            "Histogram '{}' bucket boundaries must be strictly increasing: {:?}",
            name, buckets
        )));
    }
    Ok(())
}
