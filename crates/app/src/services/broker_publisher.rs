//! Broker publisher — owns the [`BrokerHandle`] and an explicit
//! connection-state machine.
//!
//! Every successful [`connect`](BrokerPublisher::connect) marks discovery as
//! pending. The flag is only cleared by a complete discovery publication, so
//! the loop can deterministically republish discovery before the next state
//! message after a reconnect.

use std::time::Duration;

use tuyabridge_domain::connection::ConnectionState;
use tuyabridge_domain::discovery::DiscoveryDescriptor;
use tuyabridge_domain::error::BrokerError;
use tuyabridge_domain::message::{Message, Qos};

use crate::ports::BrokerHandle;

/// Raised (as the source of [`BrokerError::PublishFailed`]) when publishing
/// without a connection.
#[derive(Debug, thiserror::Error)]
#[error("broker not connected")]
pub struct NotConnected;

/// Single owner of the broker connection.
pub struct BrokerPublisher<B> {
    handle: B,
    state: ConnectionState,
    discovery_pending: bool,
    timeout: Duration,
}

impl<B: BrokerHandle> BrokerPublisher<B> {
    /// Wrap `handle`; every call to it is bounded by `timeout`.
    pub fn new(handle: B, timeout: Duration) -> Self {
        Self {
            handle,
            state: ConnectionState::Disconnected,
            discovery_pending: false,
            timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether discovery must be (re)published before any state.
    #[must_use]
    pub fn needs_discovery(&self) -> bool {
        self.discovery_pending
    }

    /// Whether publishing can be attempted.
    ///
    /// Also checks the handle's link so a connection dropped between two
    /// cycles is noticed before the next publish.
    pub fn is_connected(&mut self) -> bool {
        if self.state.is_usable() && !self.handle.is_connected() {
            tracing::warn!("broker link lost");
            self.state = ConnectionState::Disconnected;
        }
        self.state.is_usable()
    }

    /// Open a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ConnectionRefused`] from the handle, or
    /// [`BrokerError::Timeout`] when the handshake does not finish in time.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&mut self) -> Result<(), BrokerError> {
        self.state = ConnectionState::Connecting;
        let result = match tokio::time::timeout(self.timeout, self.handle.connect()).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::Timeout(self.timeout)),
        };

        match result {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.discovery_pending = true;
                tracing::info!("broker connected");
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                tracing::warn!(error = %err, kind = err.kind(), "broker connection failed");
                Err(err)
            }
        }
    }

    /// Publish every retained discovery message, then clear the pending flag.
    ///
    /// # Errors
    ///
    /// Stops at the first failed message; the flag stays set so the next
    /// cycle retries the whole set.
    #[tracing::instrument(skip_all, fields(unique_id = %descriptor.unique_id))]
    pub async fn publish_discovery(
        &mut self,
        descriptor: &DiscoveryDescriptor,
    ) -> Result<(), BrokerError> {
        let messages = descriptor.messages();
        for message in &messages {
            self.publish(message).await?;
        }
        self.discovery_pending = false;
        tracing::info!(count = messages.len(), "discovery published");
        Ok(())
    }

    /// Publish a state or availability payload with at-least-once delivery.
    ///
    /// # Errors
    ///
    /// See [`publish`](Self::publish).
    pub async fn publish_state(
        &mut self,
        topic: &str,
        payload: &str,
        retained: bool,
    ) -> Result<(), BrokerError> {
        let message = Message {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain: retained,
            qos: Qos::AtLeastOnce,
        };
        self.publish(&message).await
    }

    /// Publish one message.
    ///
    /// # Errors
    ///
    /// [`BrokerError::PublishFailed`] when not connected or when the client
    /// rejects the message (state becomes [`ConnectionState::Degraded`]);
    /// [`BrokerError::Timeout`] / [`BrokerError::ConnectionRefused`] drop the
    /// state to [`ConnectionState::Disconnected`].
    pub async fn publish(&mut self, message: &Message) -> Result<(), BrokerError> {
        if !self.state.is_usable() {
            return Err(BrokerError::PublishFailed(Box::new(NotConnected)));
        }

        let result = match tokio::time::timeout(self.timeout, self.handle.publish(message)).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::Timeout(self.timeout)),
        };

        match &result {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                tracing::trace!(topic = %message.topic, retain = message.retain, "published");
            }
            Err(err) => {
                self.state = match err {
                    BrokerError::PublishFailed(_) => ConnectionState::Degraded,
                    BrokerError::ConnectionRefused(_) | BrokerError::Timeout(_) => {
                        ConnectionState::Disconnected
                    }
                };
                tracing::warn!(topic = %message.topic, error = %err, kind = err.kind(), "publish failed");
            }
        }
        result
    }

    /// Close the connection. Best effort, bounded by the timeout.
    pub async fn disconnect(&mut self) {
        if tokio::time::timeout(self.timeout, self.handle.disconnect())
            .await
            .is_err()
        {
            tracing::debug!("broker disconnect timed out");
        }
        self.state = ConnectionState::Disconnected;
    }
}
