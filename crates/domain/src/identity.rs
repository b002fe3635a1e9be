//! Device identity — who we talk to, where, and with which credentials.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Vendor cloud region hosting the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Eu,
    Us,
    Cn,
    In,
}

impl Region {
    /// Base URL of the OpenAPI endpoint serving this region.
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Eu => "https://openapi.tuyaeu.com",
            Self::Us => "https://openapi.tuyaus.com",
            Self::Cn => "https://openapi.tuyacn.com",
            Self::In => "https://openapi.tuyain.com",
        }
    }

    /// Short region code (`eu`, `us`, …).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Eu => "eu",
            Self::Us => "us",
            Self::Cn => "cn",
            Self::In => "in",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raised when a region or protocol code is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownCodeError {
    /// What was being parsed (`"region"`, `"protocol version"`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl FromStr for Region {
    type Err = UnknownCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eu" => Ok(Self::Eu),
            "us" => Ok(Self::Us),
            "cn" => Ok(Self::Cn),
            "in" => Ok(Self::In),
            _ => Err(UnknownCodeError {
                kind: "region",
                value: s.to_string(),
            }),
        }
    }
}

/// Which flavour of the vendor API exposes the data points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Device status endpoint (`/v1.0/iot-03/devices/{id}/status`).
    V1,
    /// Shadow properties endpoint (`/v2.0/cloud/thing/{id}/shadow/properties`).
    #[default]
    V2,
}

impl FromStr for ProtocolVersion {
    type Err = UnknownCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().trim_start_matches('v') {
            "1" | "1.0" => Ok(Self::V1),
            "2" | "2.0" => Ok(Self::V2),
            _ => Err(UnknownCodeError {
                kind: "protocol version",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
            Self::V2 => f.write_str("v2"),
        }
    }
}

/// OpenAPI project credentials.
///
/// The access key never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_id: String,
    pub access_key: String,
}

impl Credentials {
    #[must_use]
    pub fn new(access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
        }
    }

    /// Access id with everything after the first eight characters masked.
    #[must_use]
    pub fn masked_access_id(&self) -> String {
        mask(&self.access_id, 8)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.masked_access_id())
            .field("access_key", &"***")
            .finish()
    }
}

/// Keep the first `visible` characters of `value` and replace the rest with `***`.
#[must_use]
pub fn mask(value: &str, visible: usize) -> String {
    let prefix: String = value.chars().take(visible).collect();
    format!("{prefix}***")
}

/// Immutable description of the bridged device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub region: Region,
    pub credentials: Credentials,
    pub protocol: ProtocolVersion,
}
