//! Device session — owns the [`DeviceHandle`] and its connection state.
//!
//! There is no background reconnect task: when a read fails on transport the
//! session drops to [`ConnectionState::Disconnected`] and the next call
//! reconnects inline. The caller's poll interval is the backoff.

use std::future::Future;
use std::time::Duration;

use tuyabridge_domain::connection::ConnectionState;
use tuyabridge_domain::data_point::DataPointMap;
use tuyabridge_domain::error::DeviceError;

use crate::ports::DeviceHandle;

/// Raised (as the source of [`DeviceError::Unreachable`]) when the vendor
/// reports the device itself as offline.
#[derive(Debug, thiserror::Error)]
#[error("device reported offline by the vendor")]
pub struct DeviceOffline;

/// Single owner of the device connection.
pub struct DeviceSession<D> {
    handle: D,
    state: ConnectionState,
    timeout: Duration,
}

impl<D: DeviceHandle> DeviceSession<D> {
    /// Wrap `handle`; every call to it is bounded by `timeout`.
    pub fn new(handle: D, timeout: Duration) -> Self {
        Self {
            handle,
            state: ConnectionState::Disconnected,
            timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the last interaction with the device succeeded.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Establish the session. A no-op while a session is already up.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unreachable`] when the vendor cannot be reached,
    /// the call times out, or the device is reported offline, and
    /// [`DeviceError::AuthFailure`] when credentials are rejected.
    #[tracing::instrument(skip(self), fields(state = %self.state))]
    pub async fn connect(&mut self) -> Result<(), DeviceError> {
        if self.state.is_usable() {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        match self.establish().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                tracing::info!("device session established");
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                tracing::warn!(error = %err, kind = err.kind(), "device session failed");
                Err(err)
            }
        }
    }

    async fn establish(&mut self) -> Result<(), DeviceError> {
        bounded(self.timeout, self.handle.connect()).await?;
        self.ensure_online().await
    }

    async fn ensure_online(&mut self) -> Result<(), DeviceError> {
        if bounded(self.timeout, self.handle.is_online()).await? {
            Ok(())
        } else {
            Err(DeviceError::Unreachable(Box::new(DeviceOffline)))
        }
    }

    async fn poll(&mut self, online_checked: bool) -> Result<DataPointMap, DeviceError> {
        if !online_checked {
            self.ensure_online().await?;
        }
        bounded(self.timeout, self.handle.read_data_points()).await
    }

    /// Read a fresh snapshot, reconnecting first if the session is down.
    ///
    /// The vendor's online flag is checked on every read, not only on connect.
    ///
    /// # Errors
    ///
    /// Propagates connect failures and read failures. Transport and auth
    /// failures, and a device reported offline, leave the session
    /// disconnected; a malformed payload only degrades it.
    pub async fn read_data_points(&mut self) -> Result<DataPointMap, DeviceError> {
        let reconnected = !self.state.is_usable();
        if reconnected {
            self.connect().await?;
        }

        match self.poll(reconnected).await {
            Ok(points) => {
                self.state = ConnectionState::Connected;
                tracing::debug!(count = points.len(), "data points read");
                Ok(points)
            }
            Err(err) => {
                self.state = match err {
                    DeviceError::MalformedResponse(_) => ConnectionState::Degraded,
                    DeviceError::Unreachable(_) | DeviceError::AuthFailure(_) => {
                        ConnectionState::Disconnected
                    }
                };
                tracing::warn!(error = %err, kind = err.kind(), state = %self.state, "data point read failed");
                Err(err)
            }
        }
    }
}

async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, DeviceError>>,
) -> Result<T, DeviceError> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|elapsed| DeviceError::Unreachable(Box::new(elapsed)))?
}
