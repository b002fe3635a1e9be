//! Broker port — the pub/sub client as seen by the core.

use std::future::Future;

use tuyabridge_domain::error::BrokerError;
use tuyabridge_domain::message::Message;

/// Capability to publish to the broker.
///
/// A single [`BrokerPublisher`](crate::services::BrokerPublisher) owns the
/// handle, so publishes never race with reconnects. Implementations must not
/// reconnect behind the publisher's back: once the link is lost,
/// [`is_connected`](Self::is_connected) reports `false` until the next
/// explicit [`connect`](Self::connect).
pub trait BrokerHandle: Send {
    /// Open a fresh connection, replacing any dead one.
    fn connect(&mut self) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Hand one message to the broker.
    fn publish(&mut self, message: &Message) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Whether the underlying link is still up.
    fn is_connected(&self) -> bool;

    /// Close the connection. Best effort.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}
