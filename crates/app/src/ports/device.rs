//! Device port — the vendor session layer as seen by the core.

use std::future::Future;

use tuyabridge_domain::data_point::DataPointMap;
use tuyabridge_domain::error::DeviceError;

/// Capability to talk to the bridged device.
///
/// Implementations live in adapter crates (e.g. `adapter_tuya_cloud`). The
/// handle is owned by a single [`DeviceSession`](crate::services::DeviceSession),
/// which adds timeouts and the connection-state machine; implementations do
/// not need to be thread-safe beyond `Send`.
pub trait DeviceHandle: Send {
    /// Establish (or re-establish) the vendor session.
    fn connect(&mut self) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Read the current data points of the device.
    fn read_data_points(&mut self)
    -> impl Future<Output = Result<DataPointMap, DeviceError>> + Send;

    /// Ask the vendor whether the device itself is currently online.
    ///
    /// The default implementation assumes it is, for transports that have no
    /// such query.
    fn is_online(&mut self) -> impl Future<Output = Result<bool, DeviceError>> + Send {
        async { Ok(true) }
    }
}
