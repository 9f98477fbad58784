//! Unverified token inspection
//!
//! Tokens are verified by the control plane. These helpers only read identifiers out of
//! them after the fact and must never be used to make an authentication decision.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised while reading token claims.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token is not a three-segment JWT.
    #[error("token is not a JWT")]
    Malformed,

    /// The payload segment is not valid base64url.
    #[error("token payload encoding is invalid")]
    Encoding(#[source] base64::DecodeError),

    /// The payload is not a JSON claims object.
    #[error("token payload is not a claims object")]
    Payload(#[source] serde_json::Error),

    /// The claims carry no `jti`.
    #[error("token carries no jti claim")]
    MissingJti,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    jti: Option<String>,
}

/// Read the `jti` claim of a JWT without verifying its signature.
///
/// # Errors
///
/// Returns a [`ClaimsError`] if the token is not a JWT or has no non-empty `jti`.
pub fn extract_jti(token: &str) -> Result<String, ClaimsError> {
    let mut segments = token.split('.');

    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ClaimsError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(ClaimsError::Encoding)?;

    let claims: Claims = serde_json::from_slice(&bytes).map_err(ClaimsError::Payload)?;

    claims
        .jti
        .filter(|jti| !jti.is_empty())
        .ok_or(ClaimsError::MissingJti)
}

/// Hex SHA-256 of the raw token, as stored for deny-list lookups.
#[must_use]
pub fn token_hash(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
