//! Bridge loop — polls the device and mirrors it onto the broker.
//!
//! ## Cycle
//!
//! 1. Broker down → reconnect and republish discovery, or skip the cycle.
//! 2. Discovery still pending from a failed attempt → publish it first.
//! 3. Read the device, translate, publish the state JSON and `online`.
//! 4. On a device failure publish `{"available":false}` and `offline`; the
//!    previous `active`/`battery` values are never republished.
//!
//! Cycles never overlap: a slow cycle delays the next tick instead of
//! queueing extra ones.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use tuyabridge_domain::discovery::{DiscoveryDescriptor, PAYLOAD_OFFLINE, PAYLOAD_ONLINE};
use tuyabridge_domain::error::{BrokerError, DeviceError};
use tuyabridge_domain::mapping::{KeyConfig, translate};
use tuyabridge_domain::reading::SensorReading;

use crate::ports::{BrokerHandle, DeviceHandle};
use crate::services::{BrokerPublisher, DeviceSession};

/// Loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Time between the start of two cycles.
    pub poll_interval: Duration,
    /// Consecutive failed cycles before the bridge reports itself degraded.
    pub degraded_after: u32,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
            degraded_after: 3,
        }
    }
}

/// Coarse health of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Starting,
    Connecting,
    Polling,
    Degraded,
}

/// What a single cycle ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A fresh reading was published with `available=true`.
    Published(SensorReading),
    /// The device could not be read; `available=false` was published.
    DeviceUnavailable,
    /// The broker could not be reached or discovery could not be published;
    /// nothing else was attempted.
    BrokerUnavailable,
    /// The broker accepted the connection but rejected a state publish.
    PublishFailed,
}

impl CycleOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// The orchestrator: one device session, one broker publisher.
pub struct Bridge<D, B> {
    device: DeviceSession<D>,
    broker: BrokerPublisher<B>,
    descriptor: DiscoveryDescriptor,
    keys: KeyConfig,
    settings: BridgeSettings,
    state: BridgeState,
    consecutive_failures: u32,
    last_published: Option<SensorReading>,
}

impl<D: DeviceHandle, B: BrokerHandle> Bridge<D, B> {
    pub fn new(
        device: DeviceSession<D>,
        broker: BrokerPublisher<B>,
        descriptor: DiscoveryDescriptor,
        keys: KeyConfig,
        settings: BridgeSettings,
    ) -> Self {
        Self {
            device,
            broker,
            descriptor,
            keys,
            settings,
            state: BridgeState::Starting,
            consecutive_failures: 0,
            last_published: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> BridgeState {
        self.state
    }

    #[must_use]
    pub fn device(&self) -> &DeviceSession<D> {
        &self.device
    }

    #[must_use]
    pub fn broker(&self) -> &BrokerPublisher<B> {
        &self.broker
    }

    /// Eagerly connect both sides and publish discovery before the first tick.
    ///
    /// Failures are only logged; the cycles retry.
    pub async fn start(&mut self) {
        self.state = BridgeState::Connecting;
        tracing::info!(
            unique_id = %self.descriptor.unique_id,
            interval_secs = self.settings.poll_interval.as_secs(),
            "bridge starting"
        );

        if let Err(err) = self.ensure_broker().await {
            tracing::warn!(error = %err, "broker not ready at startup, retrying on next cycle");
        }
        if let Err(err) = self.device.connect().await {
            tracing::warn!(error = %err, "device not ready at startup, retrying on next cycle");
        }
    }

    /// Run cycles on a fixed interval until `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        self.start().await;

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        self.stop().await;
    }

    /// Execute exactly one poll cycle.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = self.cycle().await;
        self.record(&outcome);
        outcome
    }

    async fn cycle(&mut self) -> CycleOutcome {
        if let Err(err) = self.ensure_broker().await {
            tracing::warn!(error = %err, kind = err.kind(), "skipping cycle, broker unavailable");
            return CycleOutcome::BrokerUnavailable;
        }

        match self.device.read_data_points().await {
            Ok(points) => {
                let reading = translate(&points, &self.keys);
                match self.publish_reading(&reading).await {
                    Ok(()) => CycleOutcome::Published(reading),
                    Err(_) => CycleOutcome::PublishFailed,
                }
            }
            Err(err) => self.publish_unavailable(&err).await,
        }
    }

    async fn ensure_broker(&mut self) -> Result<(), BrokerError> {
        if !self.broker.is_connected() {
            self.broker.connect().await?;
        }
        if self.broker.needs_discovery() {
            self.broker.publish_discovery(&self.descriptor).await?;
        }
        Ok(())
    }

    async fn publish_reading(&mut self, reading: &SensorReading) -> Result<(), BrokerError> {
        self.publish_pair(reading, PAYLOAD_ONLINE).await?;

        if self.last_published.as_ref() == Some(reading) {
            tracing::debug!(%reading, "state unchanged");
        } else {
            tracing::info!(%reading, "state updated");
        }
        self.last_published = Some(*reading);
        Ok(())
    }

    async fn publish_unavailable(&mut self, cause: &DeviceError) -> CycleOutcome {
        if self.last_published.is_none_or(|prev| prev.available) {
            tracing::warn!(error = %cause, kind = cause.kind(), "device unavailable");
        } else {
            tracing::debug!(error = %cause, kind = cause.kind(), "device still unavailable");
        }

        let reading = SensorReading::unavailable();
        match self.publish_pair(&reading, PAYLOAD_OFFLINE).await {
            Ok(()) => {
                self.last_published = Some(reading);
                CycleOutcome::DeviceUnavailable
            }
            Err(_) => CycleOutcome::PublishFailed,
        }
    }

    async fn publish_pair(
        &mut self,
        reading: &SensorReading,
        availability: &str,
    ) -> Result<(), BrokerError> {
        self.broker
            .publish_state(&self.descriptor.state_topic, &reading.to_payload(), true)
            .await?;
        self.broker
            .publish_state(&self.descriptor.availability_topic, availability, true)
            .await
    }

    fn record(&mut self, outcome: &CycleOutcome) {
        if outcome.is_success() {
            if self.state == BridgeState::Degraded {
                tracing::info!(
                    failed_cycles = self.consecutive_failures,
                    "bridge recovered"
                );
            }
            self.consecutive_failures = 0;
            self.state = BridgeState::Polling;
            return;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= self.settings.degraded_after {
            if self.state != BridgeState::Degraded {
                tracing::warn!(
                    failed_cycles = self.consecutive_failures,
                    ?outcome,
                    "bridge degraded"
                );
            }
            self.state = BridgeState::Degraded;
        } else if self.state != BridgeState::Degraded {
            self.state = BridgeState::Polling;
        }
    }

    async fn stop(&mut self) {
        tracing::info!("bridge stopping");
        if self.broker.is_connected()
            && let Err(err) = self
                .broker
                .publish_state(&self.descriptor.availability_topic, PAYLOAD_OFFLINE, true)
                .await
        {
            tracing::debug!(error = %err, "could not publish offline availability");
        }
        self.broker.disconnect().await;
    }
}
