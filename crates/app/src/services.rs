//! Connection owners wrapping the port handles.

pub mod broker_publisher;
pub mod device_session;

pub use broker_publisher::BrokerPublisher;
pub use device_session::DeviceSession;
