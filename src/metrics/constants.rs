//! Well-known label keys, metric names and units.

// Common labels
pub const METRIC_LABEL_DEVICE_ID: &str = "device.id";
pub const METRIC_LABEL_DEVICE_PORT_ID: &str = "device.port.id";
pub const METRIC_LABEL_DEVICE_PSU_ID: &str = "device.psu.id";
pub const METRIC_LABEL_DEVICE_QUEUE_ID: &str = "device.queue.id";
pub const METRIC_LABEL_DEVICE_SENSOR_ID: &str = "device.sensor.id";
pub const METRIC_LABEL_DEVICE_FAN_ID: &str = "device.fan.id";

// Port metrics
pub const METRIC_NAME_PORT_RX_BPS: &str = "port.rx.bps";
pub const METRIC_NAME_PORT_TX_BPS: &str = "port.tx.bps";
pub const METRIC_NAME_PORT_RX_UTIL: &str = "port.rx.util";
pub const METRIC_NAME_PORT_TX_UTIL: &str = "port.tx.util";
pub const METRIC_NAME_PORT_RX_OK: &str = "port.rx.ok";
pub const METRIC_NAME_PORT_TX_OK: &str = "port.tx.ok";
pub const METRIC_NAME_PORT_RX_ERR: &str = "port.rx.err";
pub const METRIC_NAME_PORT_TX_ERR: &str = "port.tx.err";
pub const METRIC_NAME_PORT_RX_DROP: &str = "port.rx.drop";
pub const METRIC_NAME_PORT_TX_DROP: &str = "port.tx.drop";
pub const METRIC_NAME_PORT_RX_OVERRUN: &str = "port.rx.overrun";
pub const METRIC_NAME_PORT_TX_OVERRUN: &str = "port.tx.overrun";

// PSU metrics
pub const METRIC_NAME_PSU_VOLTAGE: &str = "psu.voltage";
pub const METRIC_NAME_PSU_CURRENT: &str = "psu.current";
pub const METRIC_NAME_PSU_POWER: &str = "psu.power";
pub const METRIC_NAME_PSU_STATUS: &str = "psu.status";
pub const METRIC_NAME_PSU_LED: &str = "psu.led";

// Queue metrics
pub const METRIC_NAME_QUEUE_WATERMARK_BYTES: &str = "queue.watermark.bytes";

// Temperature metrics
pub const METRIC_NAME_TEMPERATURE_READING: &str = "temperature.reading";
pub const METRIC_NAME_TEMPERATURE_HIGH_TH: &str = "temperature.high_th";
pub const METRIC_NAME_TEMPERATURE_LOW_TH: &str = "temperature.low_th";
pub const METRIC_NAME_TEMPERATURE_CRIT_HIGH_TH: &str = "temperature.crit_high_th";
pub const METRIC_NAME_TEMPERATURE_CRIT_LOW_TH: &str = "temperature.crit_low_th";
pub const METRIC_NAME_TEMPERATURE_WARNING: &str = "temperature.warning";

// Fan metrics
pub const METRIC_NAME_FAN_SPEED: &str = "fan.speed";
pub const METRIC_NAME_FAN_STATUS: &str = "fan.status";

// BGP metrics
pub const METRIC_NAME_BGP_CONVERGENCE_TIME_PORT_RESTART: &str = "bgp.convergence_time.port_restart";

// Units
pub const UNIT_SECONDS: &str = "s";
pub const UNIT_BYTES: &str = "bytes";
pub const UNIT_BYTES_PER_SECOND: &str = "bytes/s";
pub const UNIT_PERCENT: &str = "percent";
pub const UNIT_COUNT: &str = "count";
pub const UNIT_VOLTS: &str = "V";
pub const UNIT_AMPERES: &str = "A";
pub const UNIT_WATTS: &str = "W";
pub const UNIT_CELSIUS: &str = "celsius";
pub const UNIT_RPM: &str = "rpm";
