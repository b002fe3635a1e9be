//! Sensor reading — the semantic state published to the broker.

use serde::Serialize;

/// Semantic state of the bridged sensor for one poll cycle.
///
/// Serialises to the JSON state payload. Absent fields are omitted so that
/// consumers never see a fabricated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorReading {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(rename = "battery", skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<u8>,
}

impl SensorReading {
    /// Reading published when the device could not be read this cycle.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            active: None,
            battery_percent: None,
        }
    }

    /// JSON payload for the state topic.
    #[must_use]
    pub fn to_payload(&self) -> String {
        // Serialising a struct of plain scalars cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

impl std::fmt::Display for SensorReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.available {
            return f.write_str("unavailable");
        }
        match self.active {
            Some(true) => f.write_str("active")?,
            Some(false) => f.write_str("inactive")?,
            None => f.write_str("unknown")?,
        }
        if let Some(battery) = self.battery_percent {
            write!(f, ", battery {battery}%")?;
        }
        Ok(())
    }
}
