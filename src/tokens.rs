//! Access token storage, signatures and blacklist
//!
//! The token record is spread over several storage keys: the access token,
//! its expiry (epoch milliseconds as a string), an optional refresh token and
//! a SHA-256 signature of the access token used to detect tampering. Revoked
//! tokens are remembered by fingerprint in a blacklist that prunes itself.

use crate::clock::Clock;
use crate::error::ClientError;
use crate::logging::mask_token;
use crate::storage::{keys, StorageAdapter};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default blacklist retention
pub const DEFAULT_BLACKLIST_RETENTION_DAYS: i64 = 90;

/// Longest token lifetime honored; larger `expiresIn` values are clamped
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Reason recorded when a token fails its signature check
pub const REASON_SIGNATURE_MISMATCH: &str = "signature_mismatch";

/// Hex SHA-256 digest of a token, used both as signature and fingerprint
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// A revoked token, identified by fingerprint only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
    pub fingerprint: String,
    pub blacklisted_at: DateTime<Utc>,
    pub reason: String,
}

/// Outcome of [`TokenStore::validate_token`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenValidation {
    Valid,
    Blacklisted,
    SignatureMismatch,
    Expired,
}

impl TokenValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenValidation::Valid)
    }
}

/// Token utilities over the storage adapter
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<StorageAdapter>,
    clock: Arc<dyn Clock>,
    blacklist_retention: Duration,
}

impl TokenStore {
    pub fn new(storage: Arc<StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            blacklist_retention: Duration::days(DEFAULT_BLACKLIST_RETENTION_DAYS),
        }
    }

    pub fn with_blacklist_retention(mut self, retention: Duration) -> Self {
        self.blacklist_retention = retention;
        self
    }

    pub fn storage(&self) -> &Arc<StorageAdapter> {
        &self.storage
    }

    /// Persist a freshly issued token with its expiry and signature
    pub fn store_auth_tokens(
        &self,
        token: &str,
        expires_in_secs: i64,
        refresh_token: Option<&str>,
    ) -> Result<(), ClientError> {
        let lifetime_ms = expires_in_secs.clamp(0, MAX_TOKEN_LIFETIME_SECS) * 1000;
        let expiry = self.clock.now_millis().saturating_add(lifetime_ms);

        self.storage.set_item(keys::ACCESS_TOKEN, token)?;
        self.storage
            .set_item(keys::TOKEN_EXPIRY, &expiry.to_string())?;
        if let Some(refresh) = refresh_token {
            self.storage.set_item(keys::REFRESH_TOKEN, refresh)?;
        }
        self.storage
            .set_item(keys::TOKEN_SIGNATURE, &fingerprint(token))?;

        debug!(token = %mask_token(token), expiry, "stored auth tokens");
        Ok(())
    }

    pub fn access_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self
            .storage
            .get_item(keys::ACCESS_TOKEN)?
            .filter(|t| !t.is_empty()))
    }

    pub fn refresh_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self
            .storage
            .get_item(keys::REFRESH_TOKEN)?
            .filter(|t| !t.is_empty()))
    }

    /// Stored expiry in epoch milliseconds; unparseable values read as absent
    pub fn expiry_millis(&self) -> Result<Option<i64>, ClientError> {
        let raw = self.storage.get_item(keys::TOKEN_EXPIRY)?;
        Ok(raw.and_then(|v| match v.trim().parse::<i64>() {
            Ok(ms) => Some(ms),
            Err(_) => {
                warn!(value = %v, "ignoring unparseable token expiry");
                None
            }
        }))
    }

    /// True when no usable expiry is stored or `now + buffer >= expiry`
    pub fn is_token_expired(&self, buffer: Duration) -> bool {
        let expiry = match self.expiry_millis() {
            Ok(Some(expiry)) => expiry,
            Ok(None) => return true,
            Err(e) => {
                warn!(error = %e, "failed to read token expiry, treating as expired");
                return true;
            }
        };

        self.clock
            .now_millis()
            .saturating_add(buffer.num_milliseconds())
            >= expiry
    }

    pub fn clear_auth_tokens(&self) -> Result<(), ClientError> {
        for key in [
            keys::ACCESS_TOKEN,
            keys::TOKEN_EXPIRY,
            keys::REFRESH_TOKEN,
            keys::TOKEN_SIGNATURE,
        ] {
            self.storage.remove_item(key)?;
        }
        debug!("cleared auth tokens");
        Ok(())
    }

    /// True only when the stored signature matches the token's digest
    pub fn verify_token_signature(&self, token: &str) -> bool {
        match self.storage.get_item(keys::TOKEN_SIGNATURE) {
            Ok(Some(stored)) => stored == fingerprint(token),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "failed to read token signature");
                false
            }
        }
    }

    /// Current blacklist, without pruning
    pub fn blacklist(&self) -> Result<Vec<BlacklistEntry>, ClientError> {
        Ok(self
            .storage
            .get_object::<Vec<BlacklistEntry>>(keys::TOKEN_BLACKLIST)?
            .unwrap_or_default())
    }

    pub fn blacklist_token(&self, token: &str, reason: &str) -> Result<(), ClientError> {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(self.blacklist_retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut entries: Vec<BlacklistEntry> = self
            .blacklist()?
            .into_iter()
            .filter(|entry| entry.blacklisted_at >= cutoff)
            .collect();

        let print = fingerprint(token);
        if !entries.iter().any(|entry| entry.fingerprint == print) {
            entries.push(BlacklistEntry {
                fingerprint: print,
                blacklisted_at: now,
                reason: reason.to_string(),
            });
        }

        self.storage.set_object(keys::TOKEN_BLACKLIST, &entries)?;
        debug!(token = %mask_token(token), reason, "blacklisted token");
        Ok(())
    }

    /// Fail-closed: empty tokens and unreadable blacklists count as listed
    pub fn is_token_blacklisted(&self, token: &str) -> bool {
        if token.is_empty() {
            return true;
        }

        match self.blacklist() {
            Ok(entries) => {
                let print = fingerprint(token);
                entries.iter().any(|entry| entry.fingerprint == print)
            }
            Err(e) => {
                warn!(error = %e, "failed to read token blacklist");
                true
            }
        }
    }

    /// Composite check: blacklist, then signature, then expiry
    pub fn validate_token(&self, token: &str) -> TokenValidation {
        if self.is_token_blacklisted(token) {
            return TokenValidation::Blacklisted;
        }

        if !self.verify_token_signature(token) {
            warn!(token = %mask_token(token), "token signature mismatch");
            if let Err(e) = self.blacklist_token(token, REASON_SIGNATURE_MISMATCH) {
                warn!(error = %e, "failed to blacklist tampered token");
            }
            return TokenValidation::SignatureMismatch;
        }

        if self.is_token_expired(Duration::zero()) {
            return TokenValidation::Expired;
        }

        TokenValidation::Valid
    }
}
