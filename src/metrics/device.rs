//! Device metric collections.
//!
//! Each collection is a struct with one gauge per definition, generated from
//! a static definition list. Duplicate attribute names are rejected at
//! compile time (they become duplicate fields).

use crate::core::Labels;
use crate::metrics::constants::*;
use crate::metrics::definition::MetricDefinition;
use crate::metrics::metric::Metric;
use crate::metrics::types::MetricType;
use crate::reporter::Reporter;

macro_rules! device_metrics {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $attr:ident => ($metric_name:expr, $description:expr, $unit:expr) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name<'r> {
            labels: Labels,
            $(
                #[doc = $description]
                pub $attr: Metric<'r>,
            )+
        }

        impl<'r> $name<'r> {
            /// Definitions backing the metrics of this collection.
            pub const DEFINITIONS: &'static [MetricDefinition] = &[
                $( MetricDefinition::new(stringify!($attr), $metric_name, $description, $unit), )+
            ];

            /// Build the collection; every metric shares `labels`.
            pub fn new(reporter: &'r dyn Reporter, labels: Labels) -> Self {
                Self {
                    $(
                        $attr: Metric::new(
                            MetricType::Gauge,
                            $metric_name,
                            $description,
                            $unit,
                            reporter,
                            labels.clone(),
                        ),
                    )+
                    labels,
                }
            }

            /// Labels shared by every metric of the collection.
            pub fn labels(&self) -> &Labels {
                &self.labels
            }
        }
    };
}

device_metrics! {
    /// Network interface statistics.
    DevicePortMetrics {
        rx_util => (METRIC_NAME_PORT_RX_UTIL, "Port RX utilization", UNIT_PERCENT),
        tx_util => (METRIC_NAME_PORT_TX_UTIL, "Port TX utilization", UNIT_PERCENT),
        rx_bps => (METRIC_NAME_PORT_RX_BPS, "Port RX throughput", UNIT_BYTES_PER_SECOND),
        tx_bps => (METRIC_NAME_PORT_TX_BPS, "Port TX throughput", UNIT_BYTES_PER_SECOND),
        rx_ok => (METRIC_NAME_PORT_RX_OK, "Port RX packets received without error", UNIT_COUNT),
        tx_ok => (METRIC_NAME_PORT_TX_OK, "Port TX packets sent without error", UNIT_COUNT),
        rx_err => (METRIC_NAME_PORT_RX_ERR, "Port RX errors", UNIT_COUNT),
        tx_err => (METRIC_NAME_PORT_TX_ERR, "Port TX errors", UNIT_COUNT),
        rx_drop => (METRIC_NAME_PORT_RX_DROP, "Port RX drops", UNIT_COUNT),
        tx_drop => (METRIC_NAME_PORT_TX_DROP, "Port TX drops", UNIT_COUNT),
        rx_overrun => (METRIC_NAME_PORT_RX_OVERRUN, "Port RX overruns", UNIT_COUNT),
        tx_overrun => (METRIC_NAME_PORT_TX_OVERRUN, "Port TX overruns", UNIT_COUNT),
    }
}

device_metrics! {
    /// Power supply measurements.
    DevicePsuMetrics {
        voltage => (METRIC_NAME_PSU_VOLTAGE, "PSU output voltage", UNIT_VOLTS),
        current => (METRIC_NAME_PSU_CURRENT, "PSU output current", UNIT_AMPERES),
        power => (METRIC_NAME_PSU_POWER, "PSU output power", UNIT_WATTS),
        status => (METRIC_NAME_PSU_STATUS, "PSU operational status", UNIT_COUNT),
        led => (METRIC_NAME_PSU_LED, "PSU LED status", UNIT_COUNT),
    }
}

device_metrics! {
    /// Buffer queue utilization.
    DeviceQueueMetrics {
        watermark_bytes => (METRIC_NAME_QUEUE_WATERMARK_BYTES, "Queue buffer watermark", UNIT_BYTES),
    }
}

device_metrics! {
    /// Thermal sensor readings and thresholds.
    DeviceTemperatureMetrics {
        reading => (METRIC_NAME_TEMPERATURE_READING, "Temperature reading", UNIT_CELSIUS),
        high_th => (METRIC_NAME_TEMPERATURE_HIGH_TH, "High temperature threshold", UNIT_CELSIUS),
        low_th => (METRIC_NAME_TEMPERATURE_LOW_TH, "Low temperature threshold", UNIT_CELSIUS),
        crit_high_th => (METRIC_NAME_TEMPERATURE_CRIT_HIGH_TH, "Critical high temperature threshold", UNIT_CELSIUS),
        crit_low_th => (METRIC_NAME_TEMPERATURE_CRIT_LOW_TH, "Critical low temperature threshold", UNIT_CELSIUS),
        warning => (METRIC_NAME_TEMPERATURE_WARNING, "Temperature warning status", UNIT_COUNT),
    }
}

device_metrics! {
    /// Cooling fan monitoring.
    DeviceFanMetrics {
        speed => (METRIC_NAME_FAN_SPEED, "Fan speed", UNIT_RPM),
        status => (METRIC_NAME_FAN_STATUS, "Fan operational status", UNIT_COUNT),
    }
}
