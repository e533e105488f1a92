//! Label sets and the precedence rule used to merge them.

use std::collections::BTreeMap;

/// Ordered key/value labels attached to a measurement.
pub type Labels = BTreeMap<String, String>;

/// Merge the three label sources of a measurement.
///
/// Later sources win on key collisions: `context`, then `common`, then
/// `additional`.
pub fn merge_labels(context: &Labels, common: &Labels, additional: Option<&Labels>) -> Labels {
    let mut merged = context.clone();
    for (key, value) in common {
        merged.insert(key.clone(), value.clone());
    }
    if let Some(additional) = additional {
        for (key, value) in additional {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Build a [`Labels`] map from `key => value` pairs.
///
/// ```
/// use test_telemetry::labels;
///
/// let labels = labels! { "device.id" => "dut-01", "iter" => 3 };
/// assert_eq!(labels["iter"], "3");
/// ```
#[macro_export]
macro_rules! labels {
    () => {
        $crate::core::Labels::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut labels = $crate::core::Labels::new();
        $(
            labels.insert(
                ::std::string::ToString::to_string(&$key),
                ::std::string::ToString::to_string(&$value),
            );
        )+
        labels
    }};
}
