//! Wire types of the OpenAPI responses we consume.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use tuyabridge_domain::data_point::{DataPointMap, DataPointValue};

use crate::error::TuyaError;

pub const TOKEN_PATH: &str = "/v1.0/token";

/// Common response wrapper: `{"success":…,"code":…,"msg":…,"result":…}`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl Envelope {
    /// Decode `result` into `T`, or classify the failure.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, TuyaError> {
        if !self.success {
            return Err(TuyaError::from_code(
                self.code.unwrap_or_default(),
                self.msg.unwrap_or_default(),
            ));
        }
        let result = self.result.ok_or(TuyaError::MissingResult)?;
        serde_json::from_value(result).map_err(TuyaError::Decode)
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expire_time: u64,
}

#[derive(Debug, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub online: Option<bool>,
}

/// One data point as reported by the status and shadow endpoints.
#[derive(Debug, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub dp_id: Option<i64>,
    #[serde(default)]
    pub value: Value,
}

/// Shadow endpoints return either a list of properties or a plain
/// `code → value` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Properties {
    List(Vec<Property>),
    Map(serde_json::Map<String, Value>),
}

impl Default for Properties {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
pub struct Shadow {
    #[serde(default)]
    pub properties: Properties,
}

impl From<Properties> for DataPointMap {
    fn from(properties: Properties) -> Self {
        match properties {
            Properties::List(list) => index(list),
            Properties::Map(object) => DataPointMap::from(&object),
        }
    }
}

/// Index every property by its code and, when present, by its numeric id.
pub fn index(properties: Vec<Property>) -> DataPointMap {
    let mut points = DataPointMap::new();
    for property in properties {
        let value = DataPointValue::from(&property.value);
        if let Some(dp_id) = property.dp_id {
            points.insert(dp_id, value.clone());
        }
        if let Some(code) = property.code {
            points.insert(code, value);
        }
    }
    points
}
