//! # tuyabridge-domain
//!
//! Pure domain model for the Tuya → MQTT bridge.
//!
//! ## Responsibilities
//! - Foundational types: device identity, error taxonomy, connection states
//! - Define **data points** (raw vendor key/value slots) as a tagged union
//! - Define **sensor readings** (semantic state derived from data points)
//! - Translate data points into readings (the data-point mapper)
//! - Render **discovery descriptors** into retained broker messages
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod connection;
pub mod error;
pub mod identity;
pub mod message;

pub mod data_point;
pub mod discovery;
pub mod mapping;
pub mod reading;
