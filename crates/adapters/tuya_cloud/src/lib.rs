//! # tuyabridge-adapter-tuya-cloud
//!
//! Tuya OpenAPI adapter — implements the [`DeviceHandle`](tuyabridge_app::ports::DeviceHandle)
//! port over the signed cloud HTTP API.
//!
//! ## How it works
//!
//! Every request carries an HMAC-SHA256 signature (see [`sign`]). `connect`
//! obtains an access token unless a fresh one is cached; business requests
//! reuse it until it is about to expire. When the API answers `1010` (token
//! invalid) the token is refreshed and the request retried once. Code `2001`
//! (device offline) is reported as unreachable.
//!
//! Data points come from the shadow properties endpoint (`v2`) or the device
//! status endpoint (`v1`) and are indexed by both their code and numeric id.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `tuyabridge-app` and `tuyabridge-domain`.

mod api;
mod client;
mod config;
mod error;
pub mod sign;

pub use client::TuyaCloudDevice;
pub use config::TuyaCloudConfig;
pub use error::TuyaError;
