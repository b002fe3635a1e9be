//! # tuyabridged — Tuya to MQTT bridge daemon
//!
//! Composition root that wires the adapters together and runs the bridge loop.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize the `tracing` subscriber
//! - Construct the Tuya cloud device and the MQTT broker (adapters)
//! - Wrap them in the device session and broker publisher
//! - Run the bridge until SIGTERM/SIGINT, then publish `offline` and disconnect
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use tracing_subscriber::EnvFilter;

use tuyabridge_adapter_mqtt::MqttBroker;
use tuyabridge_adapter_tuya_cloud::TuyaCloudDevice;
use tuyabridge_app::bridge::Bridge;
use tuyabridge_app::services::{BrokerPublisher, DeviceSession};
use tuyabridge_domain::discovery::DiscoveryDescriptor;
use tuyabridge_domain::identity::mask;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    let identity = config.tuya.identity()?;
    tracing::info!(
        access_id = %mask(&config.tuya.access_id, 8),
        device_id = %mask(&config.tuya.device_id, 6),
        region = %identity.region,
        protocol = %identity.protocol,
        entity_id = %config.entity.id,
        mqtt = %format_args!("{}:{}", config.mqtt.host, config.mqtt.port),
        poll_interval_secs = config.bridge.poll_interval_secs,
        "tuyabridged starting"
    );
    if config.data_points.active.is_none() {
        tracing::warn!("no active data point configured, state will only carry availability");
    }

    // Device
    let device = TuyaCloudDevice::new(identity, &config.tuya)?;
    tracing::debug!(base_url = device.base_url(), "Tuya OpenAPI endpoint");

    // Broker
    let descriptor = DiscoveryDescriptor::new(
        &config.tuya.device_id,
        &config.entity,
        &config.topics,
        &config.data_points,
    );
    let broker = MqttBroker::new(
        config.mqtt.clone(),
        config.mqtt_client_id(),
        Some(descriptor.availability_message(false)),
    );

    // Bridge
    let timeout = config.bridge.operation_timeout();
    let bridge = Bridge::new(
        DeviceSession::new(device, timeout),
        BrokerPublisher::new(broker, timeout),
        descriptor,
        config.data_points.clone(),
        config.bridge.settings(),
    );
    bridge.run(shutdown_signal()).await;

    tracing::info!("tuyabridged stopped");
    Ok(())
}

fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
