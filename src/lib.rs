//! Test telemetry: label-merged metric batches for test runs.
//!
//! Tests record gauges, counters and histograms against a reporter. Each
//! measurement carries the test context labels of the run, the metric's
//! common labels and optional per-call labels. Calling `report()` flushes
//! everything buffered so far as one timestamped batch.
//!
//! # Reporters
//!
//! - **TS**: encodes batches as OTLP metrics and exports them over gRPC, or
//!   logs them when no collector is configured
//! - **DB**: writes one JSON document per batch for offline analysis
//! - **Mock**: keeps batches in memory for tests
//!
//! # Architecture
//!
//! - `core`: configuration, errors, labels and test context
//! - `metrics`: metric handles, definitions and device collections
//! - `reporter`: buffering, the report protocol and the backends
//! - `cli`: the `telemetry-files` command
//!
//! # Example
//!
//! ```no_run
//! use test_telemetry::core::{DbConfig, TestContext, TestRun};
//! use test_telemetry::metrics::DevicePortMetrics;
//! use test_telemetry::reporter::{DbReporter, Reporter};
//! use test_telemetry::labels;
//!
//! fn main() -> test_telemetry::Result<()> {
//!     let run = TestRun::new("test_port_throughput");
//!     let context = TestContext::detect(Some(&run), None);
//!     let reporter = DbReporter::new(&DbConfig::default(), context)?;
//!
//!     let port = DevicePortMetrics::new(
//!         &reporter,
//!         labels! { "device.id" => "dut-01", "device.port.id" => "Ethernet0" },
//!     );
//!     port.rx_util.record(42.0, None);
//!     port.tx_util.record(37.5, Some(&labels! { "iteration" => 1 }));
//!
//!     reporter.report()?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod metrics;
pub mod reporter;

// Re-export core types for convenience
pub use crate::core::{Config, Labels, Result, TelemetryError, TestContext};
pub use crate::metrics::{CounterMetric, GaugeMetric, HistogramMetric, Metric, MetricCollection};
pub use crate::reporter::{DbReporter, FlushGuard, MockReporter, Reporter, TsReporter};
