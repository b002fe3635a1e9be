//! Data points — raw vendor key/value slots reported by the device.
//!
//! Vendors expose data points either by small integer id (`1`, `4`, …) or by
//! code (`doorcontact_state`, `battery_percentage`, …). Both are stored as
//! string keys; integer ids are stringified.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Key of a single data point.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DataPointKey(String);

impl DataPointKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DataPointKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DataPointKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for DataPointKey {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for DataPointKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataPointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Accept both `active = "1"` and `active = 1` in configuration files.
impl<'de> Deserialize<'de> for DataPointKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Self::from(id),
            Raw::Str(code) => Self(code),
        })
    }
}

/// A single, loosely typed data-point value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DataPointValue {
    Bool(bool),
    Int(i64),
    String(String),
    /// Anything we cannot represent (floats with a fraction, arrays, objects, null).
    Unknown,
}

impl DataPointValue {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&serde_json::Value> for DataPointValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| integral_float(n.as_f64()?))
                .map_or(Self::Unknown, Self::Int),
            _ => Self::Unknown,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn integral_float(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value <= i64::MAX as f64;
    (value.is_finite() && value.trunc() == value && in_range).then_some(value as i64)
}

/// Snapshot of every data point reported by one successful read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DataPointMap(BTreeMap<DataPointKey, DataPointValue>);

impl DataPointMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a data point.
    pub fn insert(&mut self, key: impl Into<DataPointKey>, value: DataPointValue) {
        self.0.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DataPointValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DataPointKey, &DataPointValue)> {
        self.0.iter()
    }
}

impl<K: Into<DataPointKey>> FromIterator<(K, DataPointValue)> for DataPointMap {
    fn from_iter<I: IntoIterator<Item = (K, DataPointValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&serde_json::Map<String, serde_json::Value>> for DataPointMap {
    fn from(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        object
            .iter()
            .map(|(key, value)| (key.as_str(), DataPointValue::from(value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_convert_json_scalars() {
        assert_eq!(DataPointValue::from(&json!(true)), DataPointValue::Bool(true));
        assert_eq!(DataPointValue::from(&json!(87)), DataPointValue::Int(87));
        assert_eq!(
            DataPointValue::from(&json!("low")),
            DataPointValue::String("low".to_string())
        );
    }

    #[test]
    fn should_convert_integral_float_to_int() {
        assert_eq!(DataPointValue::from(&json!(55.0)), DataPointValue::Int(55));
    }

    #[test]
    fn should_mark_fractional_float_as_unknown() {
        assert_eq!(DataPointValue::from(&json!(55.5)), DataPointValue::Unknown);
    }

    #[test]
    fn should_mark_null_and_composites_as_unknown() {
        assert_eq!(DataPointValue::from(&json!(null)), DataPointValue::Unknown);
        assert_eq!(DataPointValue::from(&json!([1, 2])), DataPointValue::Unknown);
        assert_eq!(DataPointValue::from(&json!({"a": 1})), DataPointValue::Unknown);
    }

    #[test]
    fn should_build_map_from_json_object() {
        let object = json!({"1": true, "4": 87, "mode": "auto"});
        let map = DataPointMap::from(object.as_object().unwrap());
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("1"), Some(&DataPointValue::Bool(true)));
        assert_eq!(map.get("4"), Some(&DataPointValue::Int(87)));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn should_stringify_integer_keys() {
        let key = DataPointKey::from(4);
        assert_eq!(key.as_str(), "4");
    }

    #[test]
    fn should_deserialize_key_from_int_or_string() {
        let key: DataPointKey = serde_json::from_str("1").unwrap();
        assert_eq!(key.as_str(), "1");
        let key: DataPointKey = serde_json::from_str("\"doorcontact_state\"").unwrap();
        assert_eq!(key.as_str(), "doorcontact_state");
    }

    #[test]
    fn should_serialize_unknown_as_null() {
        let map: DataPointMap = [("1", DataPointValue::Unknown), ("2", DataPointValue::Int(3))]
            .into_iter()
            .collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"1":null,"2":3}"#);
    }
}
