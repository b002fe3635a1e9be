//! MQTT adapter error types.

use tuyabridge_domain::error::BrokerError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// No live connection to publish on.
    #[error("MQTT client not connected")]
    NotConnected,

    /// The broker rejected the CONNECT packet.
    #[error("MQTT broker refused the connection: {0}")]
    Refused(String),

    /// The event loop stopped before the broker acknowledged the connection.
    #[error("MQTT event loop stopped before CONNACK")]
    LinkClosed,

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into the core [`BrokerError`] taxonomy for propagation across
    /// port boundaries.
    #[must_use]
    pub fn into_domain(self) -> BrokerError {
        match self {
            Self::Refused(_) | Self::LinkClosed => BrokerError::ConnectionRefused(Box::new(self)),
            Self::NotConnected | Self::Client(_) => BrokerError::PublishFailed(Box::new(self)),
        }
    }
}

impl From<MqttError> for BrokerError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
