//! Home Assistant MQTT discovery — descriptor and rendered config messages.
//!
//! Topic layout:
//!
//! | Purpose | Topic |
//! |---------|-------|
//! | Binary sensor config | `{discovery_prefix}/binary_sensor/{unique_id}/config` |
//! | Battery sensor config | `{discovery_prefix}/sensor/{unique_id}_battery/config` |
//! | State (JSON) | `{topic_prefix}/{entity_id}/state` |
//! | Availability | `{topic_prefix}/{entity_id}/availability` |
//!
//! The battery sensor is only announced when a battery data point is mapped.

use serde::{Deserialize, Serialize};

use crate::mapping::KeyConfig;
use crate::message::Message;

/// Availability payload while the device answers.
pub const PAYLOAD_ONLINE: &str = "online";
/// Availability payload while the device (or the bridge) is gone.
pub const PAYLOAD_OFFLINE: &str = "offline";

const MANUFACTURER: &str = "Tuya";
const MODEL: &str = "Cloud";

const ACTIVE_TEMPLATE: &str = "{% if value_json.active is defined %}\
{{ 'ON' if value_json.active else 'OFF' }}{% else %}None{% endif %}";
const BATTERY_TEMPLATE: &str = "{% if value_json.battery is defined %}\
{{ value_json.battery }}{% else %}None{% endif %}";

/// User-facing description of the bridged entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EntityInfo {
    /// Short identifier used in topics (`tuya_sensor`).
    pub id: String,
    /// Display name (`Tuya Sensor`).
    pub name: String,
    /// Home Assistant binary sensor device class (`opening`, `door`, `motion`, …).
    pub device_class: String,
}

impl Default for EntityInfo {
    fn default() -> Self {
        Self {
            id: "tuya_sensor".to_string(),
            name: "Tuya Sensor".to_string(),
            device_class: "opening".to_string(),
        }
    }
}

/// Topic prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TopicLayout {
    /// Prefix Home Assistant listens on for discovery configs.
    pub discovery_prefix: String,
    /// Prefix for the state and availability topics.
    pub topic_prefix: String,
}

impl Default for TopicLayout {
    fn default() -> Self {
        Self {
            discovery_prefix: "homeassistant".to_string(),
            topic_prefix: "tuya".to_string(),
        }
    }
}

/// Everything needed to announce the entity. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryDescriptor {
    pub name: String,
    pub unique_id: String,
    pub device_class: String,
    pub device_id: String,
    pub discovery_prefix: String,
    pub state_topic: String,
    pub availability_topic: String,
    pub with_battery: bool,
}

impl DiscoveryDescriptor {
    #[must_use]
    pub fn new(device_id: &str, entity: &EntityInfo, topics: &TopicLayout, keys: &KeyConfig) -> Self {
        let base = format!("{}/{}", topics.topic_prefix, entity.id);
        Self {
            name: entity.name.clone(),
            unique_id: format!("{device_id}_{}", entity.id),
            device_class: entity.device_class.clone(),
            device_id: device_id.to_string(),
            discovery_prefix: topics.discovery_prefix.clone(),
            state_topic: format!("{base}/state"),
            availability_topic: format!("{base}/availability"),
            with_battery: keys.has_battery(),
        }
    }

    #[must_use]
    pub fn binary_sensor_config_topic(&self) -> String {
        format!("{}/binary_sensor/{}/config", self.discovery_prefix, self.unique_id)
    }

    #[must_use]
    pub fn battery_config_topic(&self) -> String {
        format!("{}/sensor/{}_battery/config", self.discovery_prefix, self.unique_id)
    }

    /// Retained discovery config messages, in publication order.
    ///
    /// Rendering is deterministic, so republishing after a reconnect leaves
    /// the retained payloads unchanged.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        let mut out = vec![Message::retained(
            self.binary_sensor_config_topic(),
            to_json(&self.binary_sensor_config()),
        )];
        if self.with_battery {
            out.push(Message::retained(
                self.battery_config_topic(),
                to_json(&self.battery_config()),
            ));
        }
        out
    }

    /// Retained availability message.
    #[must_use]
    pub fn availability_message(&self, online: bool) -> Message {
        let payload = if online { PAYLOAD_ONLINE } else { PAYLOAD_OFFLINE };
        Message::retained(self.availability_topic.clone(), payload)
    }

    fn device(&self) -> DeviceBlock<'_> {
        DeviceBlock {
            identifiers: [self.device_id.as_str()],
            manufacturer: MANUFACTURER,
            model: MODEL,
            name: &self.name,
        }
    }

    fn binary_sensor_config(&self) -> ComponentConfig<'_> {
        ComponentConfig {
            name: self.name.clone(),
            unique_id: self.unique_id.clone(),
            state_topic: &self.state_topic,
            availability_topic: &self.availability_topic,
            payload_available: PAYLOAD_ONLINE,
            payload_not_available: PAYLOAD_OFFLINE,
            device_class: &self.device_class,
            value_template: ACTIVE_TEMPLATE,
            payload_on: Some("ON"),
            payload_off: Some("OFF"),
            unit_of_measurement: None,
            state_class: None,
            entity_category: None,
            device: self.device(),
        }
    }

    fn battery_config(&self) -> ComponentConfig<'_> {
        ComponentConfig {
            name: format!("{} Battery", self.name),
            unique_id: format!("{}_battery", self.unique_id),
            state_topic: &self.state_topic,
            availability_topic: &self.availability_topic,
            payload_available: PAYLOAD_ONLINE,
            payload_not_available: PAYLOAD_OFFLINE,
            device_class: "battery",
            value_template: BATTERY_TEMPLATE,
            payload_on: None,
            payload_off: None,
            unit_of_measurement: Some("%"),
            state_class: Some("measurement"),
            entity_category: Some("diagnostic"),
            device: self.device(),
        }
    }
}

#[derive(Serialize)]
struct DeviceBlock<'a> {
    identifiers: [&'a str; 1],
    manufacturer: &'static str,
    model: &'static str,
    name: &'a str,
}

#[derive(Serialize)]
struct ComponentConfig<'a> {
    name: String,
    unique_id: String,
    state_topic: &'a str,
    availability_topic: &'a str,
    payload_available: &'static str,
    payload_not_available: &'static str,
    device_class: &'a str,
    value_template: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_off: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_category: Option<&'static str>,
    device: DeviceBlock<'a>,
}

fn to_json(config: &ComponentConfig<'_>) -> String {
    // Only strings and nested structs: serialisation cannot fail.
    serde_json::to_string(config).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_point::DataPointKey;
    use crate::message::Qos;

    fn descriptor(with_battery: bool) -> DiscoveryDescriptor {
        let keys = KeyConfig {
            active: Some(DataPointKey::from("1")),
            battery: with_battery.then(|| DataPointKey::from("4")),
        };
        let entity = EntityInfo {
            id: "front_door".to_string(),
            name: "Front Door".to_string(),
            device_class: "door".to_string(),
        };
        DiscoveryDescriptor::new("bf1234", &entity, &TopicLayout::default(), &keys)
    }

    #[test]
    fn should_derive_unique_id_and_topics() {
        let desc = descriptor(true);
        assert_eq!(desc.unique_id, "bf1234_front_door");
        assert_eq!(desc.state_topic, "tuya/front_door/state");
        assert_eq!(desc.availability_topic, "tuya/front_door/availability");
        assert_eq!(
            desc.binary_sensor_config_topic(),
            "homeassistant/binary_sensor/bf1234_front_door/config"
        );
        assert_eq!(
            desc.battery_config_topic(),
            "homeassistant/sensor/bf1234_front_door_battery/config"
        );
    }

    #[test]
    fn should_render_binary_sensor_config() {
        let messages = descriptor(false).messages();
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert!(msg.retain);
        assert_eq!(msg.qos, Qos::AtLeastOnce);

        let json: serde_json::Value = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(json["name"], "Front Door");
        assert_eq!(json["unique_id"], "bf1234_front_door");
        assert_eq!(json["device_class"], "door");
        assert_eq!(json["state_topic"], "tuya/front_door/state");
        assert_eq!(json["availability_topic"], "tuya/front_door/availability");
        assert_eq!(json["payload_available"], "online");
        assert_eq!(json["payload_not_available"], "offline");
        assert!(json["value_template"].as_str().unwrap().contains("value_json.active"));
        assert_eq!(json["device"]["identifiers"][0], "bf1234");
        assert_eq!(json["device"]["manufacturer"], "Tuya");
        assert!(json.get("unit_of_measurement").is_none());
    }

    #[test]
    fn should_render_battery_config_when_battery_is_mapped() {
        let messages = descriptor(true).messages();
        assert_eq!(messages.len(), 2);
        let json: serde_json::Value = serde_json::from_str(&messages[1].payload).unwrap();
        assert_eq!(json["name"], "Front Door Battery");
        assert_eq!(json["unique_id"], "bf1234_front_door_battery");
        assert_eq!(json["device_class"], "battery");
        assert_eq!(json["unit_of_measurement"], "%");
        assert_eq!(json["entity_category"], "diagnostic");
        assert!(json["value_template"].as_str().unwrap().contains("value_json.battery"));
        assert!(json.get("payload_on").is_none());
    }

    #[test]
    fn should_render_identical_messages_on_republish() {
        let desc = descriptor(true);
        assert_eq!(desc.messages(), desc.messages());
        assert_eq!(desc.messages(), descriptor(true).messages());
    }

    #[test]
    fn should_build_availability_messages() {
        let desc = descriptor(false);
        let online = desc.availability_message(true);
        let offline = desc.availability_message(false);
        assert_eq!(online.topic, "tuya/front_door/availability");
        assert_eq!(online.payload, "online");
        assert_eq!(offline.payload, "offline");
        assert!(online.retain && offline.retain);
    }

    #[test]
    fn should_honour_custom_prefixes() {
        let topics = TopicLayout {
            discovery_prefix: "ha".to_string(),
            topic_prefix: "bridge".to_string(),
        };
        let desc = DiscoveryDescriptor::new(
            "dev",
            &EntityInfo::default(),
            &topics,
            &KeyConfig::default(),
        );
        assert_eq!(desc.state_topic, "bridge/tuya_sensor/state");
        assert_eq!(
            desc.binary_sensor_config_topic(),
            "ha/binary_sensor/dev_tuya_sensor/config"
        );
    }
}
