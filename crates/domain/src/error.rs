//! Error taxonomy shared across the workspace.
//!
//! The core only knows two families of failures: the ones coming from the
//! device side and the ones coming from the broker side. Adapters keep their
//! own detailed error types and convert into these at the port boundary,
//! carrying the original error as the `source`.

use std::time::Duration;

/// Boxed error used as the `source` of the taxonomy variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures reported by the device session.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device (or the vendor cloud in front of it) could not be reached,
    /// or reported itself offline.
    #[error("device unreachable")]
    Unreachable(#[source] BoxError),

    /// The vendor rejected the configured credentials or session token.
    #[error("device authentication failed")]
    AuthFailure(#[source] BoxError),

    /// The vendor answered, but with something we could not decode.
    #[error("malformed device response")]
    MalformedResponse(#[source] BoxError),
}

impl DeviceError {
    /// Short, stable label for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::AuthFailure(_) => "auth_failure",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Failures reported by the broker publisher.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The broker refused or dropped the connection.
    #[error("broker connection refused")]
    ConnectionRefused(#[source] BoxError),

    /// A publish could not be handed to the broker client.
    #[error("broker publish failed")]
    PublishFailed(#[source] BoxError),

    /// A broker operation did not complete in time.
    #[error("broker operation timed out after {0:?}")]
    Timeout(Duration),
}

impl BrokerError {
    /// Short, stable label for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionRefused(_) => "connection_refused",
            Self::PublishFailed(_) => "publish_failed",
            Self::Timeout(_) => "timeout",
        }
    }
}
