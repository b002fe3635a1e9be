//! MQTT broker configuration.

use serde::Deserialize;

/// Configuration for the MQTT broker connection.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub host: String,
    /// MQTT broker port.
    pub port: u16,
    /// Username; empty means anonymous.
    pub username: String,
    /// Password, only sent together with a username.
    pub password: String,
    /// MQTT client identifier. Empty means `tuya-bridge-{entity_id}`.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
}

impl MqttConfig {
    /// Credentials to send, if a username is configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        (!self.username.is_empty()).then_some((self.username.as_str(), self.password.as_str()))
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "core-mosquitto".to_string(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            client_id: String::new(),
            keep_alive_secs: 60,
        }
    }
}

impl std::fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("client_id", &self.client_id)
            .field("keep_alive_secs", &self.keep_alive_secs)
            .finish()
    }
}
