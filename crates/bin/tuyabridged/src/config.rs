//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `tuyabridge.toml` in the working directory, or at the path in
//! `TUYABRIDGE_CONFIG`. Every section has defaults so the file is optional;
//! a container can be configured from the environment alone, using the same
//! variable names as the Home Assistant add-on options (`ACCESS_ID`,
//! `DEVICE_ID`, `MQTT_HOST`, …). Environment variables take precedence over
//! file values.

use std::time::Duration;

use serde::Deserialize;

use tuyabridge_adapter_mqtt::MqttConfig;
use tuyabridge_adapter_tuya_cloud::TuyaCloudConfig;
use tuyabridge_app::bridge::BridgeSettings;
use tuyabridge_domain::data_point::DataPointKey;
use tuyabridge_domain::discovery::{EntityInfo, TopicLayout};
use tuyabridge_domain::mapping::KeyConfig;

const DEFAULT_PATH: &str = "tuyabridge.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tuya OpenAPI project and device.
    pub tuya: TuyaCloudConfig,
    /// Entity shown in Home Assistant.
    pub entity: EntityInfo,
    /// Topic prefixes.
    pub topics: TopicLayout,
    /// Which data points feed the reading.
    pub data_points: KeyConfig,
    /// Loop timing.
    pub bridge: BridgeConfig,
    /// MQTT broker connection.
    pub mqtt: MqttConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Loop timing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Seconds between two polls.
    pub poll_interval_secs: u64,
    /// Upper bound for any single device or broker operation.
    pub operation_timeout_secs: u64,
    /// Consecutive failed cycles before the bridge reports itself degraded.
    pub degraded_after: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("TUYABRIDGE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply overrides from `lookup`; values that do not parse are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(val) = var("ACCESS_ID") {
            self.tuya.access_id = val;
        }
        if let Some(val) = var("ACCESS_KEY") {
            self.tuya.access_key = val;
        }
        if let Some(val) = var("REGION") {
            self.tuya.region = val;
        }
        if let Some(val) = var("DEVICE_ID") {
            self.tuya.device_id = val;
        }
        if let Some(val) = var("TUYA_ENDPOINT") {
            self.tuya.endpoint = val;
        }
        if let Some(val) = var("TUYA_PROTOCOL") {
            self.tuya.protocol = val;
        }
        if let Some(val) = var("ENTITY_ID") {
            self.entity.id = val;
        }
        if let Some(val) = var("NAME") {
            self.entity.name = val;
        }
        if let Some(val) = var("DEVICE_CLASS") {
            self.entity.device_class = val;
        }
        if let Some(secs) = var("POLL_INTERVAL").and_then(|val| val.trim().parse().ok()) {
            self.bridge.poll_interval_secs = secs;
        }
        if let Some(val) = var("MQTT_HOST") {
            self.mqtt.host = val;
        }
        if let Some(port) = var("MQTT_PORT").and_then(|val| val.trim().parse().ok()) {
            self.mqtt.port = port;
        }
        if let Some(val) = var("MQTT_USER") {
            self.mqtt.username = val;
        }
        if let Some(val) = var("MQTT_PASSWORD") {
            self.mqtt.password = val;
        }
        if let Some(val) = var("DPS_ACTIVE") {
            self.data_points.active = Some(DataPointKey::new(val.trim()));
        }
        if let Some(val) = var("DPS_BATTERY") {
            self.data_points.battery = Some(DataPointKey::new(val.trim()));
        }
        if let Some(val) = var("TUYABRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("tuya.access_id", &self.tuya.access_id),
            ("tuya.access_key", &self.tuya.access_key),
            ("tuya.device_id", &self.tuya.device_id),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Validation(format!("{name} must be set")));
        }
        if self.tuya.protocol_version().is_none() {
            return Err(ConfigError::Validation(format!(
                "tuya.protocol must be v1 or v2, got {:?}",
                self.tuya.protocol
            )));
        }
        if self.bridge.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.bridge.operation_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "operation timeout must be non-zero".to_string(),
            ));
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::Validation(
                "MQTT port must be non-zero".to_string(),
            ));
        }
        if self.entity.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "entity.id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// MQTT client id; `tuya-bridge-{entity_id}` unless configured.
    #[must_use]
    pub fn mqtt_client_id(&self) -> String {
        if self.mqtt.client_id.is_empty() {
            format!("tuya-bridge-{}", self.entity.id)
        } else {
            self.mqtt.client_id.clone()
        }
    }
}

impl BridgeConfig {
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    #[must_use]
    pub fn settings(&self) -> BridgeSettings {
        BridgeSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            degraded_after: self.degraded_after,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 20,
            operation_timeout_secs: 10,
            degraded_after: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tuyabridge=info,rumqttc=warn".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
