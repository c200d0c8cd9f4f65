//! Admin sessions: a shared passcode exchanged for a signed, expiring token.
//!
//! Token layout before encoding: 8-byte big-endian expiry (unix seconds)
//! followed by the 32-byte blake3 keyed hash of those 8 bytes. Encoded as
//! unpadded URL-safe base64.

use std::time::Duration;

use chrono::{DateTime, Utc};
use data_encoding::BASE64URL_NOPAD;
use serde::Serialize;

use crate::config::AuthConfig;
use crate::error::AppError;

const KEY_CONTEXT: &str = "datamart 2025 admin session token v1";
const EXPIRY_LEN: usize = 8;
const MAC_LEN: usize = 32;

/// A freshly issued admin token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Checks the admin passcode and issues/verifies session tokens.
#[derive(Clone)]
pub struct AdminAuth {
    passcode: blake3::Hash,
    key: [u8; 32],
    ttl: Duration,
}

impl std::fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuth")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AdminAuth {
    /// `signing_secret` defaults to the passcode, so rotating the passcode
    /// also invalidates outstanding tokens.
    pub fn new(passcode: &str, signing_secret: Option<&str>, config: AuthConfig) -> Self {
        let secret = signing_secret.unwrap_or(passcode);
        Self {
            passcode: blake3::hash(passcode.as_bytes()),
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
            ttl: config.session_ttl,
        }
    }

    /// Constant-time passcode comparison. Empty codes never match.
    pub fn check_code(&self, code: &str) -> bool {
        !code.is_empty() && blake3::hash(code.as_bytes()) == self.passcode
    }

    /// Exchanges a passcode for a token.
    pub fn login(&self, code: &str, now: DateTime<Utc>) -> Result<SessionToken, AppError> {
        if !self.check_code(code) {
            return Err(AppError::Unauthorized);
        }
        Ok(self.issue(now))
    }

    pub fn issue(&self, now: DateTime<Utc>) -> SessionToken {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(12));
        let expires_at = now + ttl;
        let expiry = expires_at.timestamp().to_be_bytes();
        let mac = blake3::keyed_hash(&self.key, &expiry);

        let mut raw = Vec::with_capacity(EXPIRY_LEN + MAC_LEN);
        raw.extend_from_slice(&expiry);
        raw.extend_from_slice(mac.as_bytes());

        SessionToken {
            token: BASE64URL_NOPAD.encode(&raw),
            expires_at,
        }
    }

    /// Verifies signature and expiry. Returns the token's expiry time.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
        let raw = BASE64URL_NOPAD
            .decode(token.trim().as_bytes())
            .map_err(|_| AppError::Unauthorized)?;
        if raw.len() != EXPIRY_LEN + MAC_LEN {
            return Err(AppError::Unauthorized);
        }
        let (expiry, mac) = raw.split_at(EXPIRY_LEN);

        let mut mac_bytes = [0u8; MAC_LEN];
        mac_bytes.copy_from_slice(mac);
        if blake3::keyed_hash(&self.key, expiry) != blake3::Hash::from_bytes(mac_bytes) {
            return Err(AppError::Unauthorized);
        }

        let mut expiry_bytes = [0u8; EXPIRY_LEN];
        expiry_bytes.copy_from_slice(expiry);
        let expires_at = DateTime::from_timestamp(i64::from_be_bytes(expiry_bytes), 0)
            .ok_or(AppError::Unauthorized)?;
        if expires_at <= now {
            return Err(AppError::Unauthorized);
        }
        Ok(expires_at)
    }
}
