//! Data-point mapper — turns a raw [`DataPointMap`] into a [`SensorReading`].
//!
//! The mapping is total: a key that is not configured is never looked up,
//! and a configured key that is missing or carries an unusable value yields
//! an absent field instead of an error. Vendor payloads are not trusted to be
//! well-formed.

use serde::Deserialize;

use crate::data_point::{DataPointKey, DataPointMap, DataPointValue};
use crate::reading::SensorReading;

/// Which data points feed which reading field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Data point carrying the binary active/inactive state.
    pub active: Option<DataPointKey>,
    /// Data point carrying the battery percentage.
    pub battery: Option<DataPointKey>,
}

impl KeyConfig {
    #[must_use]
    pub fn has_battery(&self) -> bool {
        self.battery.is_some()
    }
}

/// Translate one snapshot into a reading. Always `available`.
#[must_use]
pub fn translate(points: &DataPointMap, keys: &KeyConfig) -> SensorReading {
    SensorReading {
        available: true,
        active: lookup(points, keys.active.as_ref()).and_then(active_from),
        battery_percent: lookup(points, keys.battery.as_ref()).and_then(battery_from),
    }
}

fn lookup<'a>(points: &'a DataPointMap, key: Option<&DataPointKey>) -> Option<&'a DataPointValue> {
    key.and_then(|k| points.get(k.as_str()))
}

fn active_from(value: &DataPointValue) -> Option<bool> {
    match value {
        DataPointValue::Bool(b) => Some(*b),
        DataPointValue::Int(n) => Some(*n != 0),
        DataPointValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "open" | "on" => Some(true),
            "false" | "closed" | "close" | "off" => Some(false),
            _ => None,
        },
        DataPointValue::Unknown => None,
    }
}

// Out-of-range percentages are dropped, not clamped.
fn battery_from(value: &DataPointValue) -> Option<u8> {
    value
        .as_int()
        .filter(|n| (0..=100).contains(n))
        .and_then(|n| u8::try_from(n).ok())
}
