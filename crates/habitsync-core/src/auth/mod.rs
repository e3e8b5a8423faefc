//! Credential lifecycle.
//!
//! ```text
//! SignedOut --(valid credential)--> SignedIn
//! SignedIn  --(expiry | sign-out | remote rejection)--> SignedOut
//! ```
//!
//! Claims are decoded without verifying the signature. That is enough to
//! decide what to show and when to stop sending an expired token; it is not
//! a security control. The remote endpoint verifies every request.

mod claims;

pub use claims::{decode_claims, Claims};

#[cfg(test)]
pub(crate) use claims::unsigned_token;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::storage::AuthConfig;

/// Default tolerance for clock drift and request latency.
pub const DEFAULT_SKEW: Duration = Duration::from_secs(45);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed credential: {0}")]
    Malformed(String),

    #[error("Credential has no identity claim")]
    MissingIdentity,

    #[error("Credential has no expiry claim")]
    MissingExpiry,

    #[error("Credential expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("Identity '{0}' is not allowed to sign in")]
    NotAllowed(String),
}

/// Who is signed in, as stored in the document.
///
/// Whether the state counts as signed in is recomputed from the credential
/// on every check; it is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub credential: String,
}

impl AuthState {
    /// Wrap a credential, filling the identity from its claims when readable.
    pub fn from_credential(credential: &str) -> Self {
        let identity = decode_claims(credential)
            .map(|claims| claims.identity)
            .unwrap_or_default();
        Self {
            identity,
            credential: credential.to_string(),
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.credential.is_empty()
    }

    pub fn is_signed_in(&self, skew: Duration) -> bool {
        is_valid(&self.credential, skew)
    }
}

/// `exp` strictly after `now + skew`.
pub fn is_valid_at(credential: &str, skew: Duration, now: DateTime<Utc>) -> bool {
    let Ok(claims) = decode_claims(credential) else {
        return false;
    };
    let Ok(skew) = chrono::Duration::from_std(skew) else {
        return false;
    };
    now.checked_add_signed(skew)
        .is_some_and(|deadline| claims.expires_at > deadline)
}

pub fn is_valid(credential: &str, skew: Duration) -> bool {
    is_valid_at(credential, skew, Utc::now())
}

/// Enforces validity and the identity allowlist.
#[derive(Debug, Clone)]
pub struct AuthGate {
    allowlist: Vec<String>,
    skew: Duration,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_SKEW)
    }
}

impl AuthGate {
    pub fn new(allowlist: Vec<String>, skew: Duration) -> Self {
        let allowlist = allowlist
            .into_iter()
            .map(|identity| identity.trim().to_lowercase())
            .filter(|identity| !identity.is_empty())
            .collect();
        Self { allowlist, skew }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.allowed_identities.clone(),
            Duration::from_secs(config.credential_skew_secs),
        )
    }

    pub fn skew(&self) -> Duration {
        self.skew
    }

    pub fn is_allowed(&self, identity: &str) -> bool {
        self.allowlist.is_empty() || self.allowlist.contains(&identity.trim().to_lowercase())
    }

    pub fn is_valid(&self, credential: &str) -> bool {
        is_valid(credential, self.skew)
    }

    pub fn is_signed_in(&self, state: &AuthState) -> bool {
        self.is_valid(&state.credential) && self.is_allowed(&state.identity)
    }

    /// Accept a freshly issued credential.
    ///
    /// # Errors
    /// Fails when the token cannot be decoded, is already (or about to be)
    /// expired, or belongs to an identity outside the allowlist. The rejected
    /// credential is not retained anywhere.
    pub fn sign_in(&self, raw: &str) -> Result<AuthState, AuthError> {
        self.sign_in_at(raw, Utc::now())
    }

    pub fn sign_in_at(&self, raw: &str, now: DateTime<Utc>) -> Result<AuthState, AuthError> {
        let credential = raw.trim();
        let claims = decode_claims(credential)?;
        if !is_valid_at(credential, self.skew, now) {
            return Err(AuthError::Expired(claims.expires_at));
        }
        if !self.is_allowed(&claims.identity) {
            tracing::warn!(identity = %claims.identity, "sign-in rejected by allowlist");
            return Err(AuthError::NotAllowed(claims.identity));
        }
        tracing::info!(identity = %claims.identity, "signed in");
        Ok(AuthState {
            identity: claims.identity,
            credential: credential.to_string(),
        })
    }

    pub fn sign_out(&self) -> AuthState {
        AuthState::default()
    }

    /// Clear a credential that no longer passes the validity check.
    /// Returns true when something was purged.
    pub fn purge_if_invalid(&self, state: &mut AuthState) -> bool {
        if state.has_credential() && !self.is_signed_in(state) {
            tracing::info!(identity = %state.identity, "discarding invalid credential");
            *state = self.sign_out();
            return true;
        }
        false
    }
}
