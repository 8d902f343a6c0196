//! Per-user key lifecycle.
//!
//! Keys are derived from the password every time they are needed and exist
//! only transiently in memory (the secret scalar zeroizes on drop). The
//! remote key store only ever sees `{public_key, salt}` — which is also why
//! a wrong password can only be detected here, by comparing the freshly
//! derived public key against the stored one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lk_crypto::{keys::derive_keypair, kdf::SALT_LEN, CryptoError, EcdhKeyPair, PublicKeyJwk};
use lk_proto::KeyRecord;
use tracing::{info, warn};

use crate::{
    error::SyncError,
    remote::{AuthProvider, RemoteKeyStore},
};

/// Published key records stay valid this long before clients re-publish.
const KEY_VALIDITY_DAYS: i64 = 365;

/// A user's full key pair plus its published metadata. The private half
/// lives only inside `keypair` and is neither serialisable nor cloneable.
pub struct UserKeyPair {
    pub user_id: String,
    pub public_key: PublicKeyJwk,
    pub salt: [u8; SALT_LEN],
    pub device_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    keypair: EcdhKeyPair,
}

impl UserKeyPair {
    pub fn keypair(&self) -> &EcdhKeyPair {
        &self.keypair
    }

    /// The record shape the remote key store persists — public material only.
    pub fn to_record(&self) -> KeyRecord {
        KeyRecord {
            user_id: self.user_id.clone(),
            public_key: self.public_key.clone(),
            salt: Some(hex::encode(self.salt)),
            device_id: Some(self.device_id.clone()),
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked: self.revoked,
        }
    }
}

/// Derive a full `UserKeyPair` from secret + salt + metadata.
pub(crate) fn assemble_keypair(
    user_id: &str,
    device_id: &str,
    secret: &str,
    salt: [u8; SALT_LEN],
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<UserKeyPair, SyncError> {
    let keypair = derive_keypair(secret.as_bytes(), &salt)?;
    let public_key = keypair.public_jwk()?;
    Ok(UserKeyPair {
        user_id: user_id.to_string(),
        public_key,
        salt,
        device_id: device_id.to_string(),
        created_at,
        expires_at,
        revoked: false,
        keypair,
    })
}

pub(crate) fn parse_salt(user_id: &str, salt_hex: &str) -> Result<[u8; SALT_LEN], SyncError> {
    let bytes = hex::decode(salt_hex).map_err(CryptoError::HexDecode)?;
    let salt: [u8; SALT_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
        SyncError::Crypto(CryptoError::InvalidKey(format!(
            "salt for user {user_id} must be {SALT_LEN} bytes, got {}",
            b.len()
        )))
    })?;
    Ok(salt)
}

/// Key lifecycle for the signed-in user.
#[derive(Clone)]
pub struct KeyManagementService {
    remote_keys: Arc<dyn RemoteKeyStore>,
    auth: Arc<dyn AuthProvider>,
    /// Identifies this installation in the published record.
    device_id: String,
}

impl KeyManagementService {
    pub fn new(
        remote_keys: Arc<dyn RemoteKeyStore>,
        auth: Arc<dyn AuthProvider>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            remote_keys,
            auth,
            device_id: device_id.into(),
        }
    }

    /// Whether a non-revoked key record exists for the user.
    pub async fn has_keys(&self, user_id: &str) -> Result<bool, SyncError> {
        Ok(self.remote_keys.get(user_id).await?.is_some())
    }

    /// Legacy detection: a record that predates salted derivation (or sits
    /// on the wrong curve) cannot be re-derived and needs migration.
    pub async fn needs_migration(&self, user_id: &str) -> Result<bool, SyncError> {
        Ok(self
            .remote_keys
            .get(user_id)
            .await?
            .map(|r| r.is_legacy())
            .unwrap_or(false))
    }

    /// Re-derive the signed-in user's key pair from their password and the
    /// stored salt. Deterministic: identical inputs always yield identical
    /// keys, so the server never needs to hold private material.
    ///
    /// Fails with `KeyMismatch` when the derived public key differs from
    /// the stored one — the sole signal for a wrong password.
    pub async fn derive_keys(&self, password: &str) -> Result<UserKeyPair, SyncError> {
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(SyncError::Authentication)?;

        let record = self
            .remote_keys
            .get(&user.id)
            .await?
            .ok_or_else(|| SyncError::KeysNotInitialized(user.id.clone()))?;
        if record.is_legacy() {
            return Err(SyncError::LegacyKeys(user.id.clone()));
        }
        let salt_hex = record
            .salt
            .as_deref()
            .ok_or_else(|| SyncError::LegacyKeys(user.id.clone()))?;
        let salt = parse_salt(&user.id, salt_hex)?;

        let derived = assemble_keypair(
            &user.id,
            record.device_id.as_deref().unwrap_or(&self.device_id),
            password,
            salt,
            record.created_at,
            record.expires_at,
        )?;

        if derived.public_key != record.public_key {
            warn!("[keys] derived key mismatch for user={}", user.id);
            return Err(SyncError::KeyMismatch {
                user_id: user.id,
                stored: record.public_key.fingerprint()?,
                derived: derived.public_key.fingerprint()?,
            });
        }
        Ok(derived)
    }

    /// First-run path: generate a salt, derive the pair, publish only the
    /// public half and the salt. Falls back to plain re-derivation when a
    /// record already exists.
    pub async fn initialize_keys(&self, password: &str) -> Result<UserKeyPair, SyncError> {
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(SyncError::Authentication)?;

        if self.remote_keys.get(&user.id).await?.is_some() {
            return self.derive_keys(password).await;
        }

        let salt = lk_crypto::kdf::generate_salt();
        let now = Utc::now();
        let pair = assemble_keypair(
            &user.id,
            &self.device_id,
            password,
            salt,
            now,
            Some(now + Duration::days(KEY_VALIDITY_DAYS)),
        )?;
        self.remote_keys.upsert(pair.to_record()).await?;
        info!(
            "[keys] initialised key pair for user={} device={}",
            user.id, self.device_id
        );
        Ok(pair)
    }
}
