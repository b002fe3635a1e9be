//! # tuyabridge-adapter-mqtt
//!
//! MQTT adapter — implements the [`BrokerHandle`] port with `rumqttc`.
//!
//! ## How it works
//!
//! [`connect`](BrokerHandle::connect) builds a fresh `AsyncClient` and spawns
//! a driver task polling its event loop. The driver reports the link state
//! through a `watch` channel and **stops at the first connection error**
//! instead of letting `rumqttc` reconnect on its own; reconnecting is the
//! publisher's decision, which is what lets it republish discovery exactly
//! once per connection.
//!
//! The availability topic is registered as last will, so the broker flips
//! it to `offline` if the bridge vanishes without a clean disconnect.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `tuyabridge-app` and `tuyabridge-domain`.

mod config;
mod error;

pub use config::MqttConfig;
pub use error::MqttError;

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, LastWill, MqttOptions,
    Outgoing, Packet, QoS,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use tuyabridge_app::ports::BrokerHandle;
use tuyabridge_domain::error::BrokerError;
use tuyabridge_domain::message::{Message, Qos};

const REQUEST_CAPACITY: usize = 16;
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Link state as seen by the driver task.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Up,
    Refused(String),
    Down,
}

struct Session {
    client: AsyncClient,
    link: watch::Receiver<LinkState>,
    driver: JoinHandle<()>,
}

/// `rumqttc`-backed broker handle.
pub struct MqttBroker {
    config: MqttConfig,
    client_id: String,
    last_will: Option<Message>,
    session: Option<Session>,
}

impl MqttBroker {
    /// Create a broker handle. Nothing is connected until
    /// [`connect`](BrokerHandle::connect) is called.
    #[must_use]
    pub fn new(config: MqttConfig, client_id: impl Into<String>, last_will: Option<Message>) -> Self {
        Self {
            config,
            client_id: client_id.into(),
            last_will,
            session: None,
        }
    }

    fn options(&self) -> MqttOptions {
        let mut opts = MqttOptions::new(&self.client_id, &self.config.host, self.config.port);
        opts.set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs.max(1))));
        opts.set_clean_session(true);
        if let Some((username, password)) = self.config.credentials() {
            opts.set_credentials(username, password);
        }
        if let Some(will) = &self.last_will {
            opts.set_last_will(LastWill::new(
                &will.topic,
                will.payload.clone(),
                qos(will.qos),
                will.retain,
            ));
        }
        opts
    }

    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.driver.abort();
        }
    }

    async fn open(&mut self) -> Result<(), MqttError> {
        self.close_session();

        let (client, eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        let (tx, mut link) = watch::channel(LinkState::Connecting);
        let driver = tokio::spawn(drive(eventloop, tx));
        self.session = Some(Session {
            client,
            link: link.clone(),
            driver,
        });

        tracing::debug!(
            host = %self.config.host,
            port = self.config.port,
            client_id = %self.client_id,
            "connecting to MQTT broker"
        );

        let outcome = link
            .wait_for(|state| *state != LinkState::Connecting)
            .await
            .map(|state| state.clone())
            .unwrap_or(LinkState::Down);

        match outcome {
            LinkState::Up => Ok(()),
            LinkState::Refused(reason) => {
                self.close_session();
                Err(MqttError::Refused(reason))
            }
            LinkState::Connecting | LinkState::Down => {
                self.close_session();
                Err(MqttError::LinkClosed)
            }
        }
    }

    fn live_client(&self) -> Result<&AsyncClient, MqttError> {
        self.session
            .as_ref()
            .filter(|session| *session.link.borrow() == LinkState::Up)
            .map(|session| &session.client)
            .ok_or(MqttError::NotConnected)
    }
}

impl BrokerHandle for MqttBroker {
    async fn connect(&mut self) -> Result<(), BrokerError> {
        self.open().await?;
        tracing::info!(host = %self.config.host, port = self.config.port, "MQTT connected");
        Ok(())
    }

    async fn publish(&mut self, message: &Message) -> Result<(), BrokerError> {
        let client = self.live_client()?;
        client
            .publish(
                message.topic.as_str(),
                qos(message.qos),
                message.retain,
                message.payload.as_bytes().to_vec(),
            )
            .await
            .map_err(MqttError::Client)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.live_client().is_ok()
    }

    async fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Err(err) = session.client.disconnect().await {
            tracing::debug!(error = %err, "MQTT disconnect request failed");
        }
        // Let the driver flush queued publishes and the DISCONNECT packet.
        let mut driver = session.driver;
        if tokio::time::timeout(DISCONNECT_GRACE, &mut driver).await.is_err() {
            driver.abort();
        }
        tracing::info!("MQTT disconnected");
    }
}

impl Drop for MqttBroker {
    fn drop(&mut self) {
        self.close_session();
    }
}

fn qos(value: Qos) -> QoS {
    match value {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
    }
}

async fn drive(mut eventloop: EventLoop, link: watch::Sender<LinkState>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    link.send_replace(LinkState::Up);
                } else {
                    link.send_replace(LinkState::Refused(format!("{:?}", ack.code)));
                    break;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                link.send_replace(LinkState::Down);
                break;
            }
            Ok(event) => tracing::trace!(?event, "MQTT event"),
            Err(ConnectionError::ConnectionRefused(code)) => {
                tracing::warn!(?code, "MQTT broker refused the connection");
                link.send_replace(LinkState::Refused(format!("{code:?}")));
                break;
            }
            Err(err) => {
                tracing::warn!(error = %err, "MQTT link lost");
                link.send_replace(LinkState::Down);
                break;
            }
        }
    }
}
