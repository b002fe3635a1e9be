//! Connection state of an external system (device or broker).

use serde::Serialize;

/// Lifecycle of a connection to one external system.
///
/// Each side (device session, broker publisher) owns its own value; the
/// bridge loop only ever reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Connected, but the last operation failed.
    Degraded,
}

impl ConnectionState {
    /// Whether operations can be attempted without reconnecting first.
    #[must_use]
    pub fn is_usable(self) -> bool {
        matches!(self, Self::Connected | Self::Degraded)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Degraded => f.write_str("degraded"),
        }
    }
}
