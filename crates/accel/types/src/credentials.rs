//! Short-lived credentials obtained through assume-role

use chrono::{DateTime, Utc};
use std::fmt;

/// Credentials produced by the credential resolver. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AssumedCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl AssumedCredential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(expiration) => expiration <= now,
            None => false,
        }
    }
}

impl fmt::Debug for AssumedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumedCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}
