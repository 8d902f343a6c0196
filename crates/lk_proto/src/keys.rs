//! Remote key store records.

use chrono::{DateTime, Utc};
use lk_crypto::PublicKeyJwk;
use serde::{Deserialize, Serialize};

/// One user's published key material as the remote key store holds it.
/// Only public material — the matching private scalar is re-derived from
/// the password on the owning device and never persisted anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    pub user_id: String,
    pub public_key: PublicKeyJwk,
    /// Hex-encoded 16-byte Argon2id salt. Legacy records predate salted
    /// derivation and carry none — they need migration before use.
    pub salt: Option<String>,
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

impl KeyRecord {
    /// Legacy detection: missing salt or a key that is not EC/P-256.
    pub fn is_legacy(&self) -> bool {
        self.salt.is_none() || self.public_key.kty != "EC" || self.public_key.crv != "P-256"
    }
}
