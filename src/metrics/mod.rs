//! Metric model: instrument kinds, metric handles and collections.
//!
//! Metrics never aggregate on their own. Every `record` call hands one
//! measurement to the reporter the metric is bound to.

pub mod collection;
pub mod constants;
pub mod definition;
pub mod device;
pub mod metric;
pub mod types;

pub use collection::MetricCollection;
pub use definition::MetricDefinition;
pub use device::{
    DeviceFanMetrics, DevicePortMetrics, DevicePsuMetrics, DeviceQueueMetrics,
    DeviceTemperatureMetrics,
};
pub use metric::{CounterMetric, GaugeMetric, HistogramMetric, Metric};
pub use types::{MetricDescriptor, MetricType};
