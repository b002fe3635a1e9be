//! # tuyabridge-app
//!
//! Application layer — **port definitions** (traits) and the bridge loop.
//!
//! ## Responsibilities
//! - Define the port traits adapters must implement:
//!   - `DeviceHandle` — connect to the vendor, read data points, reachability
//!   - `BrokerHandle` — connect to the broker, publish messages
//! - Own the connection-state machines around those handles
//!   (`DeviceSession`, `BrokerPublisher`), including timeouts
//! - Run the poll → translate → publish loop (`Bridge`)
//!
//! ## Dependency rule
//! Depends on `tuyabridge-domain` only (plus `tokio` for timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod bridge;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;
