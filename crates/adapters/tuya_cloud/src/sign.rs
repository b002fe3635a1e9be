//! OpenAPI request signing (HMAC-SHA256, signature v2).
//!
//! ```text
//! string_to_sign = METHOD \n SHA256(body) \n \n path?sorted_query
//! message        = access_id [+ access_token] + t + nonce + string_to_sign
//! sign           = HEX_UPPER(HMAC-SHA256(access_key, message))
//! ```

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use tuyabridge_domain::identity::Credentials;

use crate::error::TuyaError;

type HmacSha256 = Hmac<Sha256>;

/// The per-request inputs of a signature.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: &'a str,
    /// Path with its already sorted query string, e.g. `/v1.0/token?grant_type=1`.
    pub path_and_query: &'a str,
    pub body: &'a str,
    /// Millisecond timestamp, as sent in the `t` header.
    pub timestamp: &'a str,
    pub nonce: &'a str,
    pub access_token: Option<&'a str>,
}

/// Render `path` with `params` sorted by key.
#[must_use]
pub fn path_and_query(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let mut params = params.to_vec();
    params.sort_unstable();
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}

fn string_to_sign(request: &Request<'_>) -> String {
    let body_hash = hex::encode(Sha256::digest(request.body.as_bytes()));
    format!(
        "{}\n{body_hash}\n\n{}",
        request.method.to_ascii_uppercase(),
        request.path_and_query
    )
}

/// Compute the `sign` header value.
///
/// # Errors
///
/// Returns [`TuyaError::InvalidKey`] if the access key is rejected as an HMAC key.
pub fn sign(credentials: &Credentials, request: &Request<'_>) -> Result<String, TuyaError> {
    let mut mac = HmacSha256::new_from_slice(credentials.access_key.as_bytes())
        .map_err(|_| TuyaError::InvalidKey)?;
    mac.update(credentials.access_id.as_bytes());
    if let Some(token) = request.access_token {
        mac.update(token.as_bytes());
    }
    mac.update(request.timestamp.as_bytes());
    mac.update(request.nonce.as_bytes());
    mac.update(string_to_sign(request).as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}
