//! Unverified decoding of credential claims.
//!
//! The credential is a JWT-shaped token. Only the payload segment is read;
//! the signature is never checked here. The remote endpoint verifies it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::AuthError;

/// Claims the client cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// `email`, or `sub` when there is no email.
    pub identity: String,
    pub expires_at: DateTime<Utc>,
}

pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let mut segments = token.trim().split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_header), Some(payload), Some(_signature), None) => payload,
        _ => return Err(AuthError::Malformed("expected three dot-separated segments".into())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::Malformed(format!("payload is not base64url: {e}")))?;
    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::Malformed(format!("payload is not JSON: {e}")))?;

    let identity = ["email", "sub"]
        .iter()
        .filter_map(|key| claims.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .ok_or(AuthError::MissingIdentity)?
        .to_string();

    let exp = claims
        .get("exp")
        .and_then(Value::as_f64)
        .filter(|exp| exp.is_finite())
        .ok_or(AuthError::MissingExpiry)?;
    let expires_at =
        DateTime::<Utc>::from_timestamp(exp.floor() as i64, 0).ok_or(AuthError::MissingExpiry)?;

    Ok(Claims {
        identity,
        expires_at,
    })
}

#[cfg(test)]
pub(crate) fn unsigned_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
