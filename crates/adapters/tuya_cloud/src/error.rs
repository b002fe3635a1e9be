//! Tuya adapter error types.

use tuyabridge_domain::error::DeviceError;

/// Response code meaning the access token expired or was revoked.
pub const TOKEN_INVALID: i64 = 1010;

/// Response codes that mean the credentials themselves are not accepted.
const AUTH_CODES: [i64; 4] = [1004, TOKEN_INVALID, 1011, 1106];

/// Response code for a device the cloud cannot reach.
pub const DEVICE_OFFLINE: i64 = 2001;

/// Errors specific to the Tuya OpenAPI adapter.
#[derive(Debug, thiserror::Error)]
pub enum TuyaError {
    /// Request could not be sent or the response body not read.
    #[error("HTTP request failed")]
    Http(#[source] reqwest::Error),

    /// The API answered with a non-success HTTP status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The API rejected the signature, the token or the project.
    #[error("Tuya API rejected credentials (code {code}): {msg}")]
    Auth { code: i64, msg: String },

    /// The cloud has lost contact with the device.
    #[error("Tuya reports the device offline (code {code}): {msg}")]
    Offline { code: i64, msg: String },

    /// The API returned `success: false` for another reason.
    #[error("Tuya API error (code {code}): {msg}")]
    Api { code: i64, msg: String },

    /// The body was not the JSON we expected.
    #[error("unexpected response body")]
    Decode(#[source] serde_json::Error),

    /// `success: true` without a `result`.
    #[error("response has no result")]
    MissingResult,

    /// The access key cannot be used as an HMAC key.
    #[error("invalid access key")]
    InvalidKey,
}

impl TuyaError {
    /// Classify a `success: false` answer.
    #[must_use]
    pub fn from_code(code: i64, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if AUTH_CODES.contains(&code) {
            Self::Auth { code, msg }
        } else if code == DEVICE_OFFLINE {
            Self::Offline { code, msg }
        } else {
            Self::Api { code, msg }
        }
    }

    /// Whether the request should be retried once with a fresh token.
    #[must_use]
    pub fn is_token_invalid(&self) -> bool {
        matches!(self, Self::Auth { code, .. } if *code == TOKEN_INVALID)
    }

    /// Convert into the core [`DeviceError`] taxonomy for propagation across
    /// port boundaries.
    #[must_use]
    pub fn into_domain(self) -> DeviceError {
        match self {
            Self::Http(_) | Self::Status(_) | Self::Offline { .. } => {
                DeviceError::Unreachable(Box::new(self))
            }
            Self::Auth { .. } | Self::InvalidKey => DeviceError::AuthFailure(Box::new(self)),
            Self::Api { .. } | Self::Decode(_) | Self::MissingResult => {
                DeviceError::MalformedResponse(Box::new(self))
            }
        }
    }
}

impl From<TuyaError> for DeviceError {
    fn from(err: TuyaError) -> Self {
        err.into_domain()
    }
}
