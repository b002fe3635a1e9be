//! Tuya OpenAPI project configuration.

use std::time::Duration;

use serde::Deserialize;

use tuyabridge_domain::identity::{
    Credentials, DeviceIdentity, ProtocolVersion, Region, UnknownCodeError, mask,
};

/// The `[tuya]` section: project credentials and the bridged device.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TuyaCloudConfig {
    /// OpenAPI project access id (a.k.a. client id).
    pub access_id: String,
    /// OpenAPI project access key (a.k.a. client secret).
    pub access_key: String,
    /// Device to bridge.
    pub device_id: String,
    /// Region code: `eu`, `us`, `cn` or `in`.
    pub region: String,
    /// `v2` (shadow properties) or `v1` (device status).
    pub protocol: String,
    /// Explicit base URL; overrides the region when set.
    pub endpoint: String,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TuyaCloudConfig {
    fn default() -> Self {
        Self {
            access_id: String::new(),
            access_key: String::new(),
            device_id: String::new(),
            region: "eu".to_string(),
            protocol: "v2".to_string(),
            endpoint: String::new(),
            request_timeout_secs: 15,
        }
    }
}

impl TuyaCloudConfig {
    /// Configured region; unknown codes fall back to [`Region::Eu`].
    #[must_use]
    pub fn region(&self) -> Region {
        self.region.parse().unwrap_or_else(|err: UnknownCodeError| {
            tracing::warn!(error = %err, fallback = %Region::Eu, "unknown region, using fallback");
            Region::Eu
        })
    }

    /// Build the immutable device identity.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCodeError`] when the protocol version is not recognised.
    pub fn identity(&self) -> Result<DeviceIdentity, UnknownCodeError> {
        Ok(DeviceIdentity {
            device_id: self.device_id.clone(),
            region: self.region(),
            credentials: Credentials::new(&self.access_id, &self.access_key),
            protocol: self.protocol.parse()?,
        })
    }

    /// Base URL for `region`, unless an explicit endpoint is configured.
    #[must_use]
    pub fn base_url(&self, region: Region) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            region.base_url().to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Protocol version, if the configured value parses.
    #[must_use]
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.protocol.parse().ok()
    }
}

impl std::fmt::Debug for TuyaCloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TuyaCloudConfig")
            .field("access_id", &mask(&self.access_id, 8))
            .field("access_key", &"***")
            .field("device_id", &mask(&self.device_id, 6))
            .field("region", &self.region)
            .field("protocol", &self.protocol)
            .field("endpoint", &self.endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
